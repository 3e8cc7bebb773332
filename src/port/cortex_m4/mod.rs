//! Cortex-M4 port implementation
//!
//! Provides context switching via PendSV exception handler.

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;

use crate::kernel::KERNEL;
use crate::types::OsStkElement;

/// Interrupt stack for MSP
#[no_mangle]
static mut INTERRUPT_STACK: [u64; 256] = [0xDEADBEEF_DEADBEEF; 256];

/// Initialize SysTick timer for system tick generation
///
/// # Arguments
/// * `cnts` - Reload value
///
/// # Example
/// For 16MHz clock with 1000Hz tick rate: cnts = 16_000_000 / 1000 = 16_000
pub fn os_cpu_systick_init(cnts: u32) {
    let mut p = unsafe { cortex_m::Peripherals::steal() };

    p.SYST.set_reload(cnts - 1);
    p.SYST.clear_current();
    p.SYST.set_clock_source(SystClkSource::Core);
    p.SYST.enable_interrupt();
    p.SYST.enable_counter();
}

/// Arm the tick and dispatch the first task
///
/// PendSV gets the lowest priority so a switch never delays another
/// handler; SysTick sits just above it. `cnts` is the SysTick reload.
///
/// # Safety
/// Call once, from `os_start`, with the kernel's first choice already
/// recorded as the next task.
#[allow(static_mut_refs)]
pub unsafe fn os_start_high_rdy(cnts: u32) -> ! {
    unsafe {
        let mut scb = cortex_m::Peripherals::steal().SCB;

        scb.set_priority(SystemHandler::PendSV, 0xFF);
        scb.set_priority(SystemHandler::SysTick, 0xF0);

        // Switch MSP to dedicated interrupt stack
        let msp_top = &INTERRUPT_STACK as *const _ as u32
            + core::mem::size_of_val(&INTERRUPT_STACK) as u32;

        asm!("msr msp, {0}", in(reg) msp_top);
        // PSP = 0 marks the first switch: there is no context to save.
        asm!("msr psp, {0}", in(reg) 0);

        os_cpu_systick_init(cnts);

        cortex_m::peripheral::SCB::set_pendsv();
        cortex_m::interrupt::enable();
    }

    loop {
        cortex_m::asm::wfi();
    }
}

/// Request a context switch
///
/// PendSV is taken once interrupts are unmasked and no other handler is
/// active.
#[inline(always)]
pub fn os_ctx_sw() {
    cortex_m::peripheral::SCB::set_pendsv();
}

/// Idle until a pended context switch fires
#[inline(always)]
pub fn os_wait_for_switch() {
    cortex_m::asm::wfi();
}

/// Helper function called from PendSV to perform TCB switching
/// Returns new task's stack pointer
#[inline(never)]
#[no_mangle]
unsafe extern "C" fn pendsv_switch_context(cur_sp: *mut OsStkElement) -> *mut OsStkElement {
    unsafe { KERNEL.get_unchecked().switch_context(cur_sp) }
}

/// PendSV exception handler - performs full context switch
///
/// 1. Save R4-R11, LR to current task's PSP (skip on the first switch)
/// 2. Call switch_context to swap TCB pointers
/// 3. Restore R4-R11, LR from new task's stack
/// 4. Exception return
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid i",
        "dsb",
        "isb",

        "mrs r0, psp",
        "cbz r0, 1f",
        "stmdb r0!, {{r4-r11, lr}}",

        "1:",
        "push {{r0, lr}}",
        "bl pendsv_switch_context",
        "pop {{r1, lr}}",

        "cbz r0, 2f",
        "ldmia r0!, {{r4-r11, lr}}",
        "msr psp, r0",

        "2:",
        "cpsie i",
        "dsb",
        "isb",

        "bx lr",
    );
}
