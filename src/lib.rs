//! Deadline-monotonic real-time kernel in Rust
//!
//! A minimal preemptive kernel for a single-core Cortex-M providing:
//! - Static deadline-monotonic priorities for periodic tasks
//! - A FIFO queue of sporadic (event-triggered) tasks
//! - Tick-driven period release and timed delays
//! - Counting semaphores with an immediate priority-ceiling protocol
//! - PendSV based context switching

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod sync;
pub mod port;

// ============ Re-exports ============

pub use self::core::config;
pub use self::core::config::*;
pub use self::core::critical;
pub use self::core::error;
pub use self::core::error::{OsError, OsResult};
pub use self::core::kernel;
pub use self::core::kernel::{os_error, os_init, os_start, OsHooks};
pub use self::core::prio;
pub use self::core::types;
pub use self::core::types::*;
pub use self::core::task;
pub use self::core::task::{
    os_task_create_aperiodic, os_task_create_periodic, os_task_stk_chk, OsTaskFn, OsTcb,
};
pub use self::core::sched;
pub use self::core::sched::{os_aperiodic_finished, os_sched, os_wait_next_period, Kernel};
pub use self::core::time;
pub use self::core::time::{os_time_dly, os_time_get};

pub use sync::sem;
pub use sync::sem::{OsSem, Semaphore};

#[cfg(feature = "pac")]
pub use stm32_metapac as pac;
