//! Critical section handling
//!
//! All kernel state is mutated with interrupts masked. The guard restores
//! the previous mask state on drop, so sections nest (a semaphore release
//! calls into the scheduler, which masks again).

use critical_section::RestoreState;

/// RAII guard for critical sections
///
/// When this guard is created, interrupts are disabled.
/// When it is dropped, interrupts are restored to their previous state.
pub struct CriticalSection {
    restore: RestoreState,
}

impl CriticalSection {
    /// Enter a critical section by disabling interrupts.
    ///
    /// Returns a guard that will restore interrupt state when dropped.
    #[inline(always)]
    pub fn enter() -> Self {
        let restore = unsafe { critical_section::acquire() };
        CriticalSection { restore }
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        unsafe { critical_section::release(self.restore) };
    }
}

/// Execute a closure with interrupts disabled
///
/// The closure receives a reference to the critical section guard,
/// which can be used to access [`CsCell`](crate::core::cs_cell::CsCell)
/// protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// True while an exception handler is active
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        use cortex_m::peripheral::{scb::VectActive, SCB};
        SCB::vect_active() != VectActive::ThreadMode
    }

    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}
