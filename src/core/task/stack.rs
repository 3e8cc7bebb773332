//! Stack painting and inspection
//!
//! Unused stack words are filled with [`CFG_STK_SENTINEL`] when a task is
//! registered. Counting intact sentinels from the base gives the stack's
//! high-water mark.

use crate::config::CFG_STK_SENTINEL;
use crate::task::OsTcb;
use crate::types::OsStkElement;

/// Fill `[base, sp)` with the sentinel
///
/// # Safety
/// `base..sp` must lie inside one stack region owned by the caller.
pub(crate) unsafe fn paint(base: *mut OsStkElement, sp: *mut OsStkElement) {
    let mut p = base;
    while p < sp {
        unsafe {
            p.write_volatile(CFG_STK_SENTINEL);
            p = p.add(1);
        }
    }
}

/// Stack usage of a task
///
/// Returns `(free, used)` in words. `free` counts the sentinel words still
/// intact from the base of the stack upward.
pub fn os_task_stk_chk(tcb: &OsTcb) -> (usize, usize) {
    if tcb.stk_base.is_null() {
        return (0, 0);
    }

    let mut free = 0;
    while free < tcb.stk_size {
        let word = unsafe { tcb.stk_base.add(free).read_volatile() };
        if word != CFG_STK_SENTINEL {
            break;
        }
        free += 1;
    }

    (free, tcb.stk_size - free)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::CONTEXT_STACK_SIZE;
    use crate::task::os_task_init;

    fn spin(_: *mut ()) -> ! {
        loop {}
    }

    #[test]
    fn test_fresh_stack_is_painted() {
        let stack: &'static mut [OsStkElement] = Box::leak(Box::new([0u32; 64]));
        let base = stack.as_ptr();
        let mut tcb = OsTcb::new();

        os_task_init(&mut tcb, stack, "paint", spin, core::ptr::null_mut()).unwrap();

        let (free, used) = os_task_stk_chk(&tcb);
        assert_eq!(free + used, 64);
        assert!(used >= CONTEXT_STACK_SIZE);
        assert!(used <= CONTEXT_STACK_SIZE + 2);
        assert_eq!(unsafe { *base }, CFG_STK_SENTINEL);
    }

    #[test]
    fn test_overwritten_sentinel_counts_as_used() {
        let stack: &'static mut [OsStkElement] = Box::leak(Box::new([0u32; 48]));
        let base = stack.as_mut_ptr();
        let mut tcb = OsTcb::new();

        os_task_init(&mut tcb, stack, "deep", spin, core::ptr::null_mut()).unwrap();
        let (free_before, _) = os_task_stk_chk(&tcb);

        unsafe { base.add(5).write(0) };
        let (free_after, used_after) = os_task_stk_chk(&tcb);
        assert!(free_before > 5);
        assert_eq!(free_after, 5);
        assert_eq!(used_after, 43);
    }

    #[test]
    fn test_unregistered_tcb() {
        assert_eq!(os_task_stk_chk(&OsTcb::new()), (0, 0));
    }
}
