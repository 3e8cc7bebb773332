//! Sporadic task queue
//!
//! FIFO of pending sporadic tasks. The head runs whenever no periodic task
//! is ready. Each entry's `prio` holds its queue position, so dequeuing the
//! head compacts every remaining position down by one.

use core::ptr::NonNull;

use crate::config::CFG_APERIODIC_TASKS_MAX;
use crate::error::{OsError, OsResult};
use crate::task::OsTcb;
use crate::types::OsPrio;

/// FIFO of pending sporadic tasks
#[derive(Debug)]
pub struct AperiodicQueue {
    entries: [Option<NonNull<OsTcb>>; CFG_APERIODIC_TASKS_MAX],
    len: usize,
}

impl AperiodicQueue {
    /// Create a new empty queue
    pub const fn new() -> Self {
        AperiodicQueue {
            entries: [None; CFG_APERIODIC_TASKS_MAX],
            len: 0,
        }
    }

    /// Head of the queue (next to run)
    #[inline]
    pub fn head(&self) -> Option<NonNull<OsTcb>> {
        self.entries[0]
    }

    /// Entry at queue position `pos`
    #[inline]
    pub fn get(&self, pos: usize) -> Option<NonNull<OsTcb>> {
        self.entries.get(pos).copied().flatten()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == CFG_APERIODIC_TASKS_MAX
    }

    pub fn contains(&self, tcb: NonNull<OsTcb>) -> bool {
        self.iter().any(|t| t == tcb)
    }

    /// Iterate from head to tail
    pub fn iter(&self) -> impl Iterator<Item = NonNull<OsTcb>> + '_ {
        self.entries[..self.len].iter().flatten().copied()
    }

    /// Append at the tail
    ///
    /// Returns the queue position assigned to the task.
    pub fn push_back(&mut self, mut tcb: NonNull<OsTcb>) -> OsResult<usize> {
        if self.is_full() {
            return Err(OsError::AperiodicQueueFull);
        }

        let pos = self.len;
        unsafe { tcb.as_mut().prio = pos as OsPrio };
        self.entries[pos] = Some(tcb);
        self.len += 1;
        Ok(pos)
    }

    /// Remove the head, shifting the rest forward
    pub fn pop_front(&mut self) -> Option<NonNull<OsTcb>> {
        let head = self.entries[0]?;

        for pos in 1..self.len {
            let mut moved = self.entries[pos].take()?;
            unsafe { moved.as_mut().prio = (pos - 1) as OsPrio };
            self.entries[pos - 1] = Some(moved);
        }
        self.entries[self.len - 1] = None;
        self.len -= 1;

        Some(head)
    }
}

impl Default for AperiodicQueue {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the queue is only modified within critical sections
unsafe impl Send for AperiodicQueue {}
unsafe impl Sync for AperiodicQueue {}

#[cfg(test)]
mod tests {
    use super::*;

    fn leak_tcb(name: &'static str) -> NonNull<OsTcb> {
        let tcb = Box::leak(Box::new(OsTcb::new()));
        tcb.name = name;
        NonNull::from(tcb)
    }

    fn name_at(queue: &AperiodicQueue, pos: usize) -> &'static str {
        unsafe { queue.get(pos).unwrap().as_ref().name }
    }

    #[test]
    fn test_fifo_and_reindex() {
        let mut queue = AperiodicQueue::new();
        let a = leak_tcb("a");
        let b = leak_tcb("b");
        let c = leak_tcb("c");

        assert_eq!(queue.push_back(a), Ok(0));
        assert_eq!(queue.push_back(b), Ok(1));
        assert_eq!(queue.push_back(c), Ok(2));
        assert!(queue.contains(b));

        assert_eq!(queue.pop_front(), Some(a));
        assert_eq!(queue.len(), 2);
        assert_eq!(name_at(&queue, 0), "b");
        assert_eq!(unsafe { queue.get(0).unwrap().as_ref().prio }, 0);
        assert_eq!(unsafe { queue.get(1).unwrap().as_ref().prio }, 1);
        assert_eq!(queue.get(2), None);

        assert_eq!(queue.pop_front(), Some(b));
        assert_eq!(queue.pop_front(), Some(c));
        assert_eq!(queue.pop_front(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue() {
        let mut queue = AperiodicQueue::new();
        for _ in 0..CFG_APERIODIC_TASKS_MAX {
            queue.push_back(leak_tcb("t")).unwrap();
        }
        assert!(queue.is_full());
        assert_eq!(queue.push_back(leak_tcb("x")), Err(OsError::AperiodicQueueFull));
    }
}
