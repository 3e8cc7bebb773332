//! Interrupt-guarded cell
//!
//! Wraps the kernel context. Every safe access proves that interrupts are
//! masked, either with a [`CriticalSection`] token or by masking them itself.

use core::cell::UnsafeCell;

use crate::critical::{critical_section, CriticalSection};

pub struct CsCell<T>(UnsafeCell<T>);

// Single core: masking interrupts is enough to serialize access.
unsafe impl<T> Sync for CsCell<T> {}

impl<T> CsCell<T> {
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Borrow the contents for as long as `cs` is held
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub fn get<'cs>(&'cs self, _cs: &'cs CriticalSection) -> &'cs mut T {
        unsafe { &mut *self.0.get() }
    }

    /// Mask interrupts and run `f` on the contents
    #[inline]
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section(|cs| f(self.get(cs)))
    }

    /// # Safety
    /// Caller already runs with interrupts masked and holds no other
    /// reference, as in the PendSV handler.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_unchecked(&self) -> &mut T {
        unsafe { &mut *self.0.get() }
    }

    #[inline(always)]
    pub const fn as_ptr(&self) -> *mut T {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_mutates_in_place() {
        let cell = CsCell::new(1u32);
        cell.lock(|v| *v += 2);
        assert_eq!(cell.lock(|v| *v), 3);
    }
}
