//! Port layer - CPU-specific implementations
//!
//! This module provides the hardware abstraction layer for context switching
//! and other CPU-specific operations. The initial context frame is built the
//! same way on every target so that host tests see the stack the processor
//! would see.

use crate::error::OsError;
use crate::task::OsTaskFn;
use crate::types::OsStkElement;

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::*;

/// Saved context of a suspended task
///
/// The lower nine words are pushed by the context switch, the upper eight by
/// the exception entry hardware.
#[repr(C, align(4))]
pub struct ContextFrame {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    /// EXC_RETURN restored into LR before the exception return
    pub exc_return: u32,
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

/// Context frame size in words
pub const CONTEXT_STACK_SIZE: usize = 17;

const _: () = assert!(core::mem::size_of::<ContextFrame>() == CONTEXT_STACK_SIZE * 4);

/// Return to thread mode, use PSP, no floating-point state
const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// Thumb state bit
const XPSR_T: u32 = 1 << 24;

/// Build the initial context frame of a task
///
/// The frame is placed just below the 8-byte aligned top of the stack; the
/// returned pointer is the frame's lowest word, which is what the context
/// switch expects in `stk_ptr`. Returns null if the stack cannot hold it.
///
/// # Safety
/// `stk_base..stk_base + stk_size` must be a writable stack region.
pub unsafe fn os_task_stk_init(
    task_fn: OsTaskFn,
    arg: *mut (),
    stk_base: *mut OsStkElement,
    stk_size: usize,
) -> *mut OsStkElement {
    if stk_base.is_null() || stk_size < CONTEXT_STACK_SIZE + 1 {
        return core::ptr::null_mut();
    }

    unsafe {
        let stk_top = stk_base.add(stk_size);
        let stk_aligned = stk_top.sub(((stk_top as usize) & 7) / 4);
        let frame_ptr = stk_aligned.sub(CONTEXT_STACK_SIZE) as *mut ContextFrame;

        frame_ptr.write(ContextFrame {
            r4: 0x0404_0404,
            r5: 0x0505_0505,
            r6: 0x0606_0606,
            r7: 0x0707_0707,
            r8: 0x0808_0808,
            r9: 0x0909_0909,
            r10: 0x1010_1010,
            r11: 0x1111_1111,
            exc_return: EXC_RETURN_THREAD_PSP,
            r0: arg as usize as u32,
            r1: 0,
            r2: 0,
            r3: 0,
            r12: 0,
            lr: os_task_return as *const () as usize as u32,
            pc: (task_fn as *const () as usize as u32) | 1,
            xpsr: XPSR_T,
        });

        frame_ptr as *mut OsStkElement
    }
}

/// Landing pad for a task entry function that returns
fn os_task_return() -> ! {
    crate::kernel::os_error(OsError::FatalReturn)
}

// Stub implementations for non-ARM targets (for testing)
#[cfg(not(target_arch = "arm"))]
pub mod stub {
    /// # Safety
    /// Never returns; there is no processor to hand over to on the host.
    pub unsafe fn os_start_high_rdy(_cnts: u32) -> ! {
        panic!("os_start_high_rdy not available on this platform");
    }

    pub fn os_ctx_sw() {
        // No-op for testing
    }

    pub fn os_wait_for_switch() {
        core::hint::spin_loop();
    }
}

#[cfg(not(target_arch = "arm"))]
pub use stub::*;
