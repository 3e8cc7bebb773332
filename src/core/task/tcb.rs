//! Task Control Block (TCB) definition
//!
//! The TCB contains all the information needed to manage a task.

use crate::config::CFG_CRITICAL_NESTING_MAX;
use crate::error::{OsError, OsResult};
use crate::types::{OsNestingCtr, OsPrio, OsStkElement, OsTaskKind, OsTick};

/// Critical regions currently held by a task
///
/// One entry per open region, innermost last. Every acquisition pushes the
/// ceiling priority; the task keeps the ceiling slot while any entry equal
/// to it remains.
#[derive(Debug, Clone, Copy)]
pub struct RegionStack {
    entries: [OsPrio; CFG_CRITICAL_NESTING_MAX],
    depth: OsNestingCtr,
}

impl RegionStack {
    pub const fn new() -> Self {
        RegionStack {
            entries: [0; CFG_CRITICAL_NESTING_MAX],
            depth: 0,
        }
    }

    /// Open a region at `prio`
    pub fn push(&mut self, prio: OsPrio) -> OsResult<()> {
        let depth = self.depth as usize;
        if depth >= CFG_CRITICAL_NESTING_MAX {
            return Err(OsError::NestingOvf);
        }
        self.entries[depth] = prio;
        self.depth += 1;
        Ok(())
    }

    /// Close the innermost region
    pub fn pop(&mut self) -> Option<OsPrio> {
        if self.depth == 0 {
            return None;
        }
        self.depth -= 1;
        Some(self.entries[self.depth as usize])
    }

    /// Innermost open region
    #[inline]
    pub fn top(&self) -> Option<OsPrio> {
        self.as_slice().last().copied()
    }

    #[inline]
    pub fn contains(&self, prio: OsPrio) -> bool {
        self.as_slice().contains(&prio)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[OsPrio] {
        &self.entries[..self.depth as usize]
    }
}

impl Default for RegionStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Task Control Block
#[repr(C)]
pub struct OsTcb {
    // ============ Stack pointer ============
    /// Saved stack pointer; the context switch reads this at offset 0
    pub stk_ptr: *mut OsStkElement,

    // ============ Stack information ============
    /// Base (lowest address) of stack
    pub stk_base: *mut OsStkElement,
    /// Stack size in words
    pub stk_size: usize,

    // ============ Task identification ============
    /// Task name
    pub name: &'static str,
    /// How the task was admitted
    pub kind: OsTaskKind,

    // ============ Priority ============
    /// Nominal priority; for sporadic tasks, the position in the queue
    pub prio: OsPrio,

    // ============ Timing ============
    /// Remaining ticks of a timed delay (0 = not delayed)
    pub timeout: OsTick,
    /// Release period
    pub period_absolute: OsTick,
    /// Ticks until next release
    pub period_dynamic: OsTick,
    /// Relative deadline
    pub deadline_absolute: OsTick,
    /// Ticks until the current deadline expires
    pub deadline_dynamic: OsTick,
    /// Deadlines that expired before the task waited for its next period
    pub deadline_misses: u32,
    /// Releases that found the task still busy with the previous one
    pub overruns: u32,

    // ============ Priority ceiling ============
    /// Open critical regions
    pub regions: RegionStack,

    // ============ Task entry point ============
    /// Task function address
    pub task_entry_addr: usize,
    /// Task argument
    pub task_entry_arg: *mut (),
}

impl OsTcb {
    /// Create a new, uninitialized TCB
    pub const fn new() -> Self {
        OsTcb {
            stk_ptr: core::ptr::null_mut(),
            stk_base: core::ptr::null_mut(),
            stk_size: 0,

            name: "",
            kind: OsTaskKind::Unused,

            prio: 0,

            timeout: 0,
            period_absolute: 0,
            period_dynamic: 0,
            deadline_absolute: 0,
            deadline_dynamic: 0,
            deadline_misses: 0,
            overruns: 0,

            regions: RegionStack::new(),

            task_entry_addr: 0,
            task_entry_arg: core::ptr::null_mut(),
        }
    }

    /// Initialize TCB to default values
    pub fn init(&mut self) {
        *self = Self::new();
    }

    /// Set release timing and reload both dynamic counters
    pub fn set_timing(&mut self, deadline: OsTick, period: OsTick) {
        self.deadline_absolute = deadline;
        self.deadline_dynamic = deadline;
        self.period_absolute = period;
        self.period_dynamic = period;
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.kind == OsTaskKind::Periodic
    }

    #[inline]
    pub fn is_aperiodic(&self) -> bool {
        self.kind == OsTaskKind::Aperiodic
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.kind == OsTaskKind::Idle
    }

    /// Check if the task is in a critical region
    #[inline]
    pub fn in_region(&self) -> bool {
        !self.regions.is_empty()
    }
}

impl Default for OsTcb {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsTcb {}
unsafe impl Sync for OsTcb {}
