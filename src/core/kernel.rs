//! Global kernel state and initialization
//!
//! This module owns the single kernel context, the idle task, the
//! application hooks and the fatal-error path.

use crate::config::{CFG_CPU_CLOCK_HZ, CFG_IDLE_STK_SIZE, CFG_TICK_RATE_HZ};
use crate::critical::{is_isr_context, CriticalSection};
use crate::core::cs_cell::CsCell;
use crate::error::OsError;
use crate::sched::Kernel;
use crate::task::{os_task_init, OsTcb};
use crate::types::OsStkElement;

// ============ Global Instances ============

/// Global kernel context
pub(crate) static KERNEL: CsCell<Kernel> = CsCell::new(Kernel::new());

/// IDLE task TCB
static mut IDLE_TCB: OsTcb = OsTcb::new();

/// IDLE task stack
static mut IDLE_STK: [OsStkElement; CFG_IDLE_STK_SIZE] = [0; CFG_IDLE_STK_SIZE];

// ============ Hooks ============

/// Application callbacks
#[derive(Clone, Copy)]
pub struct OsHooks {
    /// Called over and over by the idle task
    pub on_idle: fn(),
    /// Called once by [`os_start`] before the first task is dispatched;
    /// the place to arm interrupt sources
    pub on_startup: fn(),
}

fn os_hook_noop() {}

impl OsHooks {
    pub const fn new() -> Self {
        OsHooks {
            on_idle: os_hook_noop,
            on_startup: os_hook_noop,
        }
    }
}

impl Default for OsHooks {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Initialization ============

/// Internal IDLE task function
fn os_idle_task(_: *mut ()) -> ! {
    let on_idle = KERNEL.lock(|k| k.hooks.on_idle);
    loop {
        on_idle();
    }
}

/// Initialize the RTOS kernel
///
/// This must be called before any other OS function. Clears all kernel
/// state, stores `hooks` and creates the IDLE task at priority 0.
pub fn os_init(hooks: OsHooks) {
    if is_isr_context() {
        os_error(OsError::IsrCall);
    }

    KERNEL.lock(|kernel| {
        if kernel.is_running() {
            return Err(OsError::OsRunning);
        }

        kernel.reset();
        kernel.hooks = hooks;

        let idle_tcb = unsafe { &mut *(&raw mut IDLE_TCB) };
        let idle_stk = unsafe { &mut *(&raw mut IDLE_STK) };
        os_task_init(idle_tcb, idle_stk, "Idle", os_idle_task, core::ptr::null_mut())?;
        kernel.register_idle(idle_tcb)
    })
    .unwrap_or_else(|err| os_error(err));

    crate::info!("kernel initialized");
}

/// Start multitasking
///
/// Runs the startup hook, then dispatches the highest priority ready task.
/// Never returns.
pub fn os_start() -> ! {
    let on_startup = KERNEL.lock(|kernel| {
        if !kernel.is_initialized() {
            return Err(OsError::OsNotInit);
        }
        if kernel.is_running() {
            return Err(OsError::OsRunning);
        }
        Ok(kernel.hooks.on_startup)
    })
    .unwrap_or_else(|err| os_error(err));

    on_startup();

    // Interrupts stay masked until the port hands over to the first task.
    let cs = CriticalSection::enter();
    let kernel = KERNEL.get(&cs);
    if let Err(err) = kernel.start() {
        os_error(err);
    }
    crate::info!("starting with {} periodic tasks", kernel.periodic_count());

    unsafe { crate::port::os_start_high_rdy(CFG_CPU_CLOCK_HZ / CFG_TICK_RATE_HZ) }
}

/// Fatal-error hook
///
/// Every kernel error ends here. Interrupts are masked and the processor
/// parks; there is no way back.
pub fn os_error(err: OsError) -> ! {
    crate::error!("fatal kernel error {}", err);
    os_halt(err)
}

#[cfg(target_arch = "arm")]
fn os_halt(_err: OsError) -> ! {
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::nop();
    }
}

// Host builds surface the error to the test harness
#[cfg(not(target_arch = "arm"))]
fn os_halt(err: OsError) -> ! {
    panic!("fatal kernel error: {}", err);
}
