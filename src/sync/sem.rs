//! Semaphore implementation
//!
//! Counting semaphores guarding shared data with the immediate
//! priority-ceiling protocol. A task that takes any semaphore runs in the
//! reserved ceiling slot, above every periodic task, until it has released
//! every region it opened. A task that finds the count at zero retries after
//! a one-tick delay.

use core::cell::UnsafeCell;
use core::ptr::NonNull;

use crate::config::CFG_PRIO_CEILING;
use crate::critical::{critical_section, is_isr_context};
use crate::error::{OsError, OsResult};
use crate::kernel::{os_error, KERNEL};
use crate::sched::{os_sched_apply, Kernel};
use crate::task::OsTcb;
use crate::time::os_time_dly;
use crate::types::{OsSemCtr, OsTaskKind};

/// Counting semaphore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsSem {
    /// Current count
    count: OsSemCtr,
    /// Count never exceeds this
    max: OsSemCtr,
}

impl OsSem {
    /// Create a new semaphore
    ///
    /// `start` is clamped to `max`.
    pub const fn new(max: OsSemCtr, start: OsSemCtr) -> Self {
        OsSem {
            count: if start > max { max } else { start },
            max,
        }
    }

    /// Reset count and limit
    ///
    /// Only valid before any task uses the semaphore.
    pub fn init(&mut self, max: OsSemCtr, start: OsSemCtr) {
        *self = Self::new(max, start);
    }

    #[inline(always)]
    pub fn count(&self) -> OsSemCtr {
        self.count
    }

    #[inline(always)]
    pub fn max(&self) -> OsSemCtr {
        self.max
    }

    /// Decrement if nonzero
    pub fn take(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.count -= 1;
        true
    }

    /// Increment, saturating at the limit
    pub fn give(&mut self) {
        if self.count < self.max {
            self.count += 1;
        }
    }
}

impl Default for OsSem {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl Kernel {
    /// Running task, which must not be idle
    fn region_owner(&self) -> OsResult<NonNull<OsTcb>> {
        let cur = self.cur.ok_or(OsError::OsNotRunning)?;
        if unsafe { cur.as_ref() }.kind == OsTaskKind::Idle {
            return Err(OsError::IdleTaskCall);
        }
        Ok(cur)
    }

    /// Open a critical region for the running task
    ///
    /// The first region elects the task as ceiling holder; nested regions
    /// only deepen its region stack.
    pub fn enter_region(&mut self) -> OsResult<()> {
        let mut cur = self.region_owner()?;
        let slot = CFG_PRIO_CEILING as usize;

        match self.tasks[slot] {
            Some(holder) if holder != cur => return Err(OsError::CeilingOccupied),
            _ => {}
        }

        let t = unsafe { cur.as_mut() };
        t.regions.push(CFG_PRIO_CEILING)?;

        if self.tasks[slot].is_none() {
            self.tasks[slot] = Some(cur);
            self.ready.insert(CFG_PRIO_CEILING);
            crate::trace!("{} raised to ceiling", t.name);
        }

        self.sched().map(|_| ())
    }

    /// Close the running task's innermost critical region
    ///
    /// The ceiling slot is vacated once no open region refers to it.
    /// Returns `true` when a context switch is needed.
    pub fn exit_region(&mut self) -> OsResult<bool> {
        let mut cur = self.region_owner()?;
        let t = unsafe { cur.as_mut() };

        if t.regions.pop().is_some() && !t.regions.contains(CFG_PRIO_CEILING) {
            if self.tasks[CFG_PRIO_CEILING as usize] != Some(cur) {
                return Err(OsError::StateInvalid);
            }
            self.tasks[CFG_PRIO_CEILING as usize] = None;
            self.ready.remove(CFG_PRIO_CEILING);
            crate::trace!("{} restored to prio {}", t.name, t.prio);
        }

        self.sched()
    }

    /// Take `sem` if it is available
    ///
    /// Returns `false` when the count is zero; nothing changes then and the
    /// caller is expected to delay and retry.
    pub fn sem_try_acquire(&mut self, sem: &mut OsSem) -> OsResult<bool> {
        self.region_owner()?;
        if sem.count() == 0 {
            return Ok(false);
        }

        self.enter_region()?;
        sem.take();
        Ok(true)
    }

    /// Give `sem` back and close the innermost region of the running task
    ///
    /// A task without an open region may release too; it only signals.
    pub fn sem_release(&mut self, sem: &mut OsSem) -> OsResult<bool> {
        self.region_owner()?;
        sem.give();
        self.exit_region()
    }

    /// Give `sem` from an interrupt handler
    ///
    /// The interrupted task's regions are left alone.
    pub fn sem_signal(&mut self, sem: &mut OsSem) -> OsResult<bool> {
        sem.give();
        self.sched()
    }
}

// ============ Safe Wrapper ============

/// Semaphore usable from a `static`
///
/// ```ignore
/// static SETPOINT_SEM: Semaphore = Semaphore::new(1, 1);
///
/// SETPOINT_SEM.acquire();
/// /* read or write the guarded data */
/// SETPOINT_SEM.release();
/// ```
pub struct Semaphore {
    inner: UnsafeCell<OsSem>,
}

unsafe impl Sync for Semaphore {}
unsafe impl Send for Semaphore {}

impl Semaphore {
    pub const fn new(max: OsSemCtr, start: OsSemCtr) -> Self {
        Semaphore {
            inner: UnsafeCell::new(OsSem::new(max, start)),
        }
    }

    /// Reset count and limit before any task uses the semaphore
    pub fn init(&self, max: OsSemCtr, start: OsSemCtr) {
        critical_section(|_cs| unsafe { (*self.inner.get()).init(max, start) });
    }

    /// Enter the guarded region, retrying every tick while the count is zero
    pub fn acquire(&self) {
        if is_isr_context() {
            os_error(OsError::IsrCall);
        }

        loop {
            let acquired = KERNEL.lock(|k| k.sem_try_acquire(unsafe { &mut *self.inner.get() }));
            match acquired {
                Ok(true) => return,
                Ok(false) => os_time_dly(1),
                Err(err) => os_error(err),
            }
        }
    }

    /// Leave the guarded region
    ///
    /// From an interrupt handler this only signals.
    pub fn release(&self) {
        KERNEL.lock(|kernel| {
            let sem = unsafe { &mut *self.inner.get() };
            let res = if is_isr_context() {
                kernel.sem_signal(sem)
            } else {
                kernel.sem_release(sem)
            };
            os_sched_apply(res);
        });
    }

    #[inline]
    pub fn count(&self) -> OsSemCtr {
        unsafe { (*self.inner.get()).count() }
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(1, 1)
    }
}
