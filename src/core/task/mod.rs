//! Task management module
//!
//! Descriptor registration, periodic admission with deadline-monotonic
//! priorities, and the sporadic task queue.

mod stack;
mod tcb;

pub use stack::os_task_stk_chk;
pub use tcb::{OsTcb, RegionStack};

use core::ptr::NonNull;

use crate::config::{
    CFG_PERIODIC_TASKS_MAX, CFG_PRIO_IDLE, CFG_STK_SIZE_MIN,
};
use crate::critical::is_isr_context;
use crate::error::{OsError, OsResult};
use crate::kernel::{os_error, KERNEL};
use crate::sched::{os_sched_apply, Kernel};
use crate::types::{OsPrio, OsStkElement, OsTaskKind, OsTick};

/// Task entry point function type
pub type OsTaskFn = fn(*mut ()) -> !;

/// Prepare a descriptor so that its first dispatch enters `task_fn`
///
/// Builds the initial context frame at the top of `stack` and paints the
/// rest with the stack sentinel. The descriptor is not yet known to the
/// scheduler.
pub fn os_task_init(
    tcb: &mut OsTcb,
    stack: &'static mut [OsStkElement],
    name: &'static str,
    task_fn: OsTaskFn,
    arg: *mut (),
) -> OsResult<()> {
    if stack.len() < CFG_STK_SIZE_MIN {
        return Err(OsError::StkSizeInvalid);
    }

    let stk_base = stack.as_mut_ptr();
    let stk_size = stack.len();

    tcb.init();
    tcb.name = name;

    let stk_ptr = unsafe { crate::port::os_task_stk_init(task_fn, arg, stk_base, stk_size) };
    if stk_ptr.is_null() {
        return Err(OsError::StkInvalid);
    }
    unsafe { stack::paint(stk_base, stk_ptr) };

    tcb.stk_ptr = stk_ptr;
    tcb.stk_base = stk_base;
    tcb.stk_size = stk_size;
    tcb.task_entry_addr = task_fn as usize;
    tcb.task_entry_arg = arg;

    Ok(())
}

impl Kernel {
    /// Register the idle task at priority 0
    pub fn register_idle(&mut self, tcb: &'static mut OsTcb) -> OsResult<()> {
        if self.tasks[CFG_PRIO_IDLE as usize].is_some() {
            return Err(OsError::PrioExist);
        }

        tcb.kind = OsTaskKind::Idle;
        tcb.prio = CFG_PRIO_IDLE;
        self.tasks[CFG_PRIO_IDLE as usize] = Some(NonNull::from(tcb));
        Ok(())
    }

    /// Admit a periodic task
    ///
    /// Priorities `1..=N` stay dense and deadline-monotonic: a shorter
    /// deadline ranks higher, then a shorter period, then earlier admission.
    /// Every task the newcomer outranks moves up one slot.
    ///
    /// Returns the priority the task holds right after admission.
    pub fn admit_periodic(
        &mut self,
        tcb: &'static mut OsTcb,
        deadline: OsTick,
        period: OsTick,
    ) -> OsResult<OsPrio> {
        if self.running {
            return Err(OsError::OsRunning);
        }
        if self.tasks[CFG_PRIO_IDLE as usize].is_none() {
            return Err(OsError::OsNotInit);
        }
        if deadline == 0 || period == 0 {
            return Err(OsError::TimingInvalid);
        }

        let n = self.n_periodic;
        if n >= CFG_PERIODIC_TASKS_MAX {
            return Err(OsError::TaskTableFull);
        }
        if self.tasks[n + 1].is_some() {
            return Err(OsError::PrioExist);
        }

        tcb.kind = OsTaskKind::Periodic;
        tcb.set_timing(deadline, period);

        // Slots are ordered lowest priority first; skip past every task the
        // newcomer outranks.
        let mut slot = 1;
        while slot <= n {
            let t = unsafe { self.tasks[slot].ok_or(OsError::StateInvalid)?.as_ref() };
            let outranks = deadline < t.deadline_absolute
                || (deadline == t.deadline_absolute && period < t.period_absolute);
            if !outranks {
                break;
            }
            slot += 1;
        }

        for j in (slot..=n).rev() {
            let mut moved = self.tasks[j].take().ok_or(OsError::StateInvalid)?;
            unsafe { moved.as_mut().prio = (j + 1) as OsPrio };
            self.tasks[j + 1] = Some(moved);
            self.move_membership(j as OsPrio, (j + 1) as OsPrio);
        }

        let prio = slot as OsPrio;
        tcb.prio = prio;
        self.tasks[slot] = Some(NonNull::from(tcb));
        self.ready.insert(prio);
        self.n_periodic += 1;

        crate::info!("periodic task admitted at prio {}", prio);
        Ok(prio)
    }

    /// Carry a task's set membership from one priority to another
    fn move_membership(&mut self, from: OsPrio, to: OsPrio) {
        for set in [&mut self.ready, &mut self.delayed, &mut self.waiting] {
            if set.is_set(from) {
                set.remove(from);
                set.insert(to);
            }
        }
    }

    /// Check that `tcb` may be (re)initialized and queued
    pub fn check_enqueue(&self, tcb: &OsTcb) -> OsResult<()> {
        let ptr = NonNull::from(tcb);
        // A finished sporadic task stays current until the switch completes.
        if tcb.kind != OsTaskKind::Unused || self.aperiodic.contains(ptr) || self.cur == Some(ptr) {
            return Err(OsError::TaskQueued);
        }
        if self.aperiodic.is_full() {
            return Err(OsError::AperiodicQueueFull);
        }
        Ok(())
    }

    /// Append a sporadic task to the queue, ready immediately
    ///
    /// Returns `true` when a context switch is needed.
    pub fn enqueue_aperiodic(&mut self, tcb: &'static mut OsTcb) -> OsResult<bool> {
        self.check_enqueue(tcb)?;

        tcb.kind = OsTaskKind::Aperiodic;
        tcb.timeout = 0;
        self.aperiodic.push_back(NonNull::from(tcb))?;

        crate::debug!("sporadic task queued, {} pending", self.aperiodic.len());
        self.sched()
    }

    /// Remove the finished sporadic task from the head of the queue
    ///
    /// Only the running head may finish itself.
    pub fn dequeue_aperiodic(&mut self) -> OsResult<bool> {
        let head = self.aperiodic.head().ok_or(OsError::NotAperiodicHead)?;
        if self.cur != Some(head) {
            return Err(OsError::NotAperiodicHead);
        }
        if unsafe { head.as_ref() }.in_region() {
            return Err(OsError::RegionOpen);
        }

        let mut done = self.aperiodic.pop_front().ok_or(OsError::StateInvalid)?;
        unsafe { done.as_mut().kind = OsTaskKind::Unused };

        crate::debug!("sporadic task finished, {} pending", self.aperiodic.len());
        self.sched()
    }

    /// Suspend the running periodic task until its next release
    pub fn wait_next_period(&mut self) -> OsResult<bool> {
        let mut cur = self.cur.ok_or(OsError::OsNotRunning)?;
        let t = unsafe { cur.as_mut() };

        match t.kind {
            OsTaskKind::Periodic => {}
            OsTaskKind::Idle => return Err(OsError::IdleTaskCall),
            _ => return Err(OsError::NotPeriodic),
        }
        if t.in_region() {
            return Err(OsError::RegionOpen);
        }

        // A delay left over from the ceiling slot is dropped
        let prio = t.prio;
        if self.ready.is_set(prio) {
            self.ready.remove(prio);
        } else if self.delayed.is_set(prio) {
            self.delayed.remove(prio);
            t.timeout = 0;
        } else {
            return Err(OsError::StateInvalid);
        }
        self.waiting.insert(prio);

        self.sched()
    }
}

/// Create and admit a periodic task
///
/// Must be called before [`os_start`](crate::kernel::os_start). Any failure
/// halts the system.
///
/// # Example
/// ```ignore
/// static mut SENSOR_TCB: OsTcb = OsTcb::new();
/// static mut SENSOR_STK: [OsStkElement; 256] = [0; 256];
///
/// fn sensor_task(_: *mut ()) -> ! {
///     loop {
///         /* sample */
///         os_wait_next_period();
///     }
/// }
///
/// os_task_create_periodic(
///     unsafe { &mut *(&raw mut SENSOR_TCB) },
///     unsafe { &mut *(&raw mut SENSOR_STK) },
///     "Sensor",
///     sensor_task,
///     5,
///     5,
/// );
/// ```
pub fn os_task_create_periodic(
    tcb: &'static mut OsTcb,
    stack: &'static mut [OsStkElement],
    name: &'static str,
    task_fn: OsTaskFn,
    deadline: OsTick,
    period: OsTick,
) -> OsPrio {
    if is_isr_context() {
        os_error(OsError::IsrCall);
    }

    KERNEL.lock(|kernel| {
        if kernel.running {
            return Err(OsError::OsRunning);
        }
        os_task_init(tcb, stack, name, task_fn, core::ptr::null_mut())?;
        kernel.admit_periodic(tcb, deadline, period)
    })
    .unwrap_or_else(|err| os_error(err))
}

/// Create a sporadic task and queue it behind any pending ones
///
/// Safe to call from an interrupt handler. The caller must not re-queue a
/// descriptor that is still pending.
pub fn os_task_create_aperiodic(
    tcb: &'static mut OsTcb,
    stack: &'static mut [OsStkElement],
    name: &'static str,
    task_fn: OsTaskFn,
) {
    KERNEL.lock(|kernel| {
        let res = kernel.check_enqueue(tcb).and_then(|_| {
            os_task_init(tcb, stack, name, task_fn, core::ptr::null_mut())?;
            kernel.enqueue_aperiodic(tcb)
        });
        os_sched_apply(res);
    });
}
