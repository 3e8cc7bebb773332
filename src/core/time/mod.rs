//! Time management module
//!
//! Provides tick handling, time delays and the tick counter.

use portable_atomic::Ordering;

use crate::critical::is_isr_context;
use crate::error::{OsError, OsResult};
use crate::kernel::{os_error, KERNEL};
use crate::sched::{os_sched_apply, Kernel};
use crate::types::{OsPrio, OsTaskKind, OsTick};

impl Kernel {
    /// Delay the running task for `ticks` ticks
    ///
    /// A periodic task moves from the ready set to the delayed set. A task
    /// that keeps running from the ceiling slot may already sit in the
    /// delayed set; its timeout is reloaded. The running sporadic task keeps
    /// its queue position but is not eligible until its timeout has drained.
    ///
    /// Returns `true` when a context switch is needed.
    pub fn delay(&mut self, ticks: OsTick) -> OsResult<bool> {
        if ticks == 0 {
            return Ok(false);
        }

        let mut cur = self.cur.ok_or(OsError::OsNotRunning)?;
        let t = unsafe { cur.as_mut() };

        match t.kind {
            OsTaskKind::Periodic => {
                let prio = t.prio;
                if self.ready.is_set(prio) {
                    self.ready.remove(prio);
                    self.delayed.insert(prio);
                } else if !self.delayed.is_set(prio) {
                    return Err(OsError::StateInvalid);
                }
                t.timeout = ticks;
            }
            OsTaskKind::Aperiodic => {
                t.timeout = ticks;
            }
            OsTaskKind::Idle => return Err(OsError::IdleTaskCall),
            OsTaskKind::Unused => return Err(OsError::StateInvalid),
        }

        self.sched()
    }

    /// Advance kernel time by one tick
    ///
    /// Drains timed delays, then releases periodic tasks whose period has
    /// elapsed and keeps the deadline bookkeeping. Always ends with a
    /// scheduling decision.
    pub fn tick(&mut self) -> OsResult<bool> {
        self.ticks.fetch_add(1, Ordering::Relaxed);

        let delayed = self.delayed;
        for prio in delayed.iter() {
            let mut task = self.tasks[prio as usize].ok_or(OsError::StateInvalid)?;
            let t = unsafe { task.as_mut() };
            if t.timeout == 0 {
                return Err(OsError::StateInvalid);
            }
            t.timeout -= 1;
            if t.timeout == 0 {
                self.delayed.remove(prio);
                self.ready.insert(prio);
            }
        }

        for mut task in self.aperiodic.iter() {
            let t = unsafe { task.as_mut() };
            t.timeout = t.timeout.saturating_sub(1);
        }

        for prio in 1..=self.n_periodic as OsPrio {
            let mut task = self.tasks[prio as usize].ok_or(OsError::StateInvalid)?;
            let t = unsafe { task.as_mut() };
            let waiting = self.waiting.is_set(prio);

            if t.deadline_dynamic > 0 {
                t.deadline_dynamic -= 1;
                if t.deadline_dynamic == 0 && !waiting {
                    t.deadline_misses = t.deadline_misses.wrapping_add(1);
                    crate::warn!("{} missed its deadline", t.name);
                }
            }

            t.period_dynamic = t.period_dynamic.saturating_sub(1);
            if t.period_dynamic == 0 {
                if waiting {
                    self.waiting.remove(prio);
                    self.ready.insert(prio);
                } else {
                    t.overruns = t.overruns.wrapping_add(1);
                }
                t.period_dynamic = t.period_absolute;
                t.deadline_dynamic = t.deadline_absolute;
            }
        }

        self.check_partition()?;
        self.sched()
    }
}

/// Time delay in ticks
///
/// Delays the calling task for the specified number of system ticks.
/// A delay of 0 returns immediately. Halts the system when called from
/// the idle task or an interrupt handler.
pub fn os_time_dly(ticks: OsTick) {
    if is_isr_context() {
        os_error(OsError::IsrCall);
    }

    KERNEL.lock(|k| os_sched_apply(k.delay(ticks)));
}

/// Get current tick count
#[inline]
pub fn os_time_get() -> OsTick {
    // The counter is atomic; reading it needs no critical section.
    unsafe { (*KERNEL.as_ptr()).tick_get() }
}

/// Tick handler
pub fn os_tick_handler() {
    KERNEL.lock(|kernel| {
        if !kernel.is_running() {
            return;
        }
        os_sched_apply(kernel.tick());
    });
}

/// SysTick interrupt handler
#[no_mangle]
pub extern "C" fn SysTick() {
    os_tick_handler();
}
