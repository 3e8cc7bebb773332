//! Scheduler module
//!
//! Fixed-priority preemptive scheduler. The highest ready periodic task runs;
//! with none ready, the head of the sporadic queue runs; otherwise idle.

mod aperiodic;

pub use aperiodic::AperiodicQueue;

use core::ptr::NonNull;

use portable_atomic::{AtomicU32, Ordering};

use crate::config::{CFG_PRIO_CEILING, CFG_PRIO_IDLE, CFG_TASK_TBL_SIZE};
use crate::critical::is_isr_context;
use crate::error::{OsError, OsResult};
use crate::kernel::{os_error, OsHooks, KERNEL};
use crate::prio::PrioSet;
use crate::task::OsTcb;
use crate::types::{OsPrio, OsStkElement, OsTaskKind, OsTaskState, OsTick};

/// Kernel context
///
/// Holds every piece of scheduling state. There is one global instance,
/// reachable only through the kernel's own operations with interrupts
/// masked; tests drive private instances directly.
pub struct Kernel {
    /// Idle at 0, periodic tasks at `1..=N`, ceiling holder at the top
    pub(crate) tasks: [Option<NonNull<OsTcb>>; CFG_TASK_TBL_SIZE],
    pub(crate) n_periodic: usize,
    pub(crate) ready: PrioSet,
    pub(crate) delayed: PrioSet,
    pub(crate) waiting: PrioSet,
    pub(crate) aperiodic: AperiodicQueue,
    /// Task owning the processor; written only by the context switch
    pub(crate) cur: Option<NonNull<OsTcb>>,
    /// Task the pending context switch will resume
    pub(crate) next: Option<NonNull<OsTcb>>,
    pub(crate) running: bool,
    pub(crate) ticks: AtomicU32,
    pub(crate) ctx_switches: u32,
    pub(crate) hooks: OsHooks,
}

impl Kernel {
    pub const fn new() -> Self {
        Self {
            tasks: [None; CFG_TASK_TBL_SIZE],
            n_periodic: 0,
            ready: PrioSet::new(),
            delayed: PrioSet::new(),
            waiting: PrioSet::new(),
            aperiodic: AperiodicQueue::new(),
            cur: None,
            next: None,
            running: false,
            ticks: AtomicU32::new(0),
            ctx_switches: 0,
            hooks: OsHooks::new(),
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    /// Mark the scheduler running and pick the first task
    pub fn start(&mut self) -> OsResult<bool> {
        if self.tasks[CFG_PRIO_IDLE as usize].is_none() {
            return Err(OsError::OsNotInit);
        }
        if self.running {
            return Err(OsError::OsRunning);
        }
        self.running = true;
        self.sched()
    }

    /// Pick the task that should own the processor
    ///
    /// Never absent: idle is the fallback.
    pub fn select_next(&self) -> OsResult<NonNull<OsTcb>> {
        if let Some(prio) = self.ready.highest() {
            return self.tasks[prio as usize].ok_or(OsError::SchedNoTask);
        }

        if let Some(head) = self.aperiodic.head() {
            if unsafe { head.as_ref() }.timeout == 0 {
                return Ok(head);
            }
        }

        self.tasks[CFG_PRIO_IDLE as usize].ok_or(OsError::SchedNoTask)
    }

    /// Scheduling decision
    ///
    /// Returns `true` when the selected task differs from the running one;
    /// the caller then pends the context switch, which happens once
    /// interrupts are unmasked.
    pub fn sched(&mut self) -> OsResult<bool> {
        if !self.running {
            return Ok(false);
        }

        let next = self.select_next()?;
        self.next = Some(next);
        if Some(next) == self.cur {
            return Ok(false);
        }

        crate::trace!("switch requested to {}", unsafe { next.as_ref() }.name);
        Ok(true)
    }

    /// Complete a context switch
    ///
    /// Stores `cur_sp` into the outgoing task (skipped when null, as on the
    /// very first switch), makes the pending task current and returns its
    /// saved stack pointer.
    pub fn switch_context(&mut self, cur_sp: *mut OsStkElement) -> *mut OsStkElement {
        if let Some(mut cur) = self.cur {
            if !cur_sp.is_null() {
                unsafe { cur.as_mut().stk_ptr = cur_sp };
            }
        }

        if self.next.is_some() {
            self.cur = self.next;
        }
        self.ctx_switches = self.ctx_switches.wrapping_add(1);

        match self.cur {
            Some(cur) => unsafe { cur.as_ref() }.stk_ptr,
            None => core::ptr::null_mut(),
        }
    }

    /// Check that every periodic task is in exactly one of the ready,
    /// delayed and waiting sets, and that no bits exist outside the table
    pub fn check_partition(&self) -> OsResult<()> {
        for prio in 1..=self.n_periodic as OsPrio {
            let memberships = [self.ready, self.delayed, self.waiting]
                .iter()
                .filter(|set| set.is_set(prio))
                .count();
            if memberships != 1 {
                return Err(OsError::StateInvalid);
            }
        }

        let table = if self.n_periodic == 0 { 0 } else { u32::MAX >> (32 - self.n_periodic) };
        let ceiling = 1u32 << (CFG_PRIO_CEILING - 1);
        let stray = (self.ready.bits() & !(table | ceiling))
            | (self.delayed.bits() & !table)
            | (self.waiting.bits() & !table);
        if stray != 0 {
            return Err(OsError::StateInvalid);
        }

        if self.ready.is_set(CFG_PRIO_CEILING) != self.tasks[CFG_PRIO_CEILING as usize].is_some() {
            return Err(OsError::StateInvalid);
        }
        Ok(())
    }

    // ============ Queries ============

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Idle task registered
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.tasks[CFG_PRIO_IDLE as usize].is_some()
    }

    /// Ticks since start
    #[inline]
    pub fn tick_get(&self) -> OsTick {
        self.ticks.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn ctx_switches(&self) -> u32 {
        self.ctx_switches
    }

    #[inline]
    pub fn ready_set(&self) -> PrioSet {
        self.ready
    }

    #[inline]
    pub fn delayed_set(&self) -> PrioSet {
        self.delayed
    }

    #[inline]
    pub fn waiting_set(&self) -> PrioSet {
        self.waiting
    }

    #[inline]
    pub fn periodic_count(&self) -> usize {
        self.n_periodic
    }

    #[inline]
    pub fn aperiodic_count(&self) -> usize {
        self.aperiodic.len()
    }

    /// Task in table slot `prio`
    pub fn task(&self, prio: OsPrio) -> Option<&OsTcb> {
        self.tasks
            .get(prio as usize)
            .copied()
            .flatten()
            .map(|t| unsafe { t.as_ref() })
    }

    /// Sporadic task at queue position `pos`
    pub fn aperiodic(&self, pos: usize) -> Option<&OsTcb> {
        self.aperiodic.get(pos).map(|t| unsafe { t.as_ref() })
    }

    /// Running task
    pub fn current(&self) -> Option<&OsTcb> {
        self.cur.map(|t| unsafe { t.as_ref() })
    }

    /// Task selected by the last scheduling decision
    pub fn next(&self) -> Option<&OsTcb> {
        self.next.map(|t| unsafe { t.as_ref() })
    }

    /// Task occupying the ceiling slot
    pub fn ceiling_holder(&self) -> Option<&OsTcb> {
        self.task(CFG_PRIO_CEILING)
    }

    /// Scheduler's view of a task
    pub fn task_state(&self, tcb: &OsTcb) -> OsTaskState {
        match tcb.kind {
            OsTaskKind::Unused => OsTaskState::Dormant,
            OsTaskKind::Idle => OsTaskState::Ready,
            OsTaskKind::Periodic => {
                let prio = tcb.prio;
                if self.delayed.is_set(prio) {
                    OsTaskState::Delayed
                } else if self.waiting.is_set(prio) {
                    OsTaskState::WaitingNextPeriod
                } else if self.ready.is_set(prio) {
                    OsTaskState::Ready
                } else {
                    OsTaskState::Dormant
                }
            }
            OsTaskKind::Aperiodic => {
                let ptr = NonNull::from(tcb);
                if self.aperiodic.head() == Some(ptr) {
                    if tcb.timeout > 0 {
                        OsTaskState::Delayed
                    } else {
                        OsTaskState::Ready
                    }
                } else if self.aperiodic.contains(ptr) {
                    OsTaskState::Queued
                } else {
                    OsTaskState::Dormant
                }
            }
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Global entry points ============

/// Act on a scheduling decision: pend the context switch or halt
pub(crate) fn os_sched_apply(res: OsResult<bool>) {
    match res {
        Ok(true) => crate::port::os_ctx_sw(),
        Ok(false) => {}
        Err(err) => os_error(err),
    }
}

/// Main scheduling point
///
/// Reconsiders which task should run and pends a context switch if it
/// differs from the running one.
pub fn os_sched() {
    KERNEL.lock(|k| os_sched_apply(k.sched()));
}

/// Suspend the calling periodic task until its next release
///
/// Call at the end of each iteration of a periodic task's body.
pub fn os_wait_next_period() {
    if is_isr_context() {
        os_error(OsError::IsrCall);
    }

    KERNEL.lock(|k| os_sched_apply(k.wait_next_period()));
}

/// Finish the calling sporadic task
///
/// Removes it from the queue and gives up the processor for good.
pub fn os_aperiodic_finished() -> ! {
    if is_isr_context() {
        os_error(OsError::IsrCall);
    }

    KERNEL.lock(|k| os_sched_apply(k.dequeue_aperiodic()));

    // The pended switch fires as soon as interrupts are unmasked and this
    // context is never resumed.
    loop {
        crate::port::os_wait_for_switch();
    }
}
