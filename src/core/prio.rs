//! Priority bitmask for O(1) highest-ready lookup
//!
//! One bit per priority level above idle: priority `p` owns bit `p - 1`.
//! The highest set bit is the highest priority, found with a single
//! leading-zero count (CLZ on Cortex-M3 and up).

use crate::types::OsPrio;

/// Set of priority levels
///
/// Used for the ready, delayed and waiting-next-period sets. Idle (priority 0)
/// has no bit; it is implicitly runnable whenever nothing else is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrioSet {
    bits: u32,
}

impl PrioSet {
    pub const fn new() -> Self {
        PrioSet { bits: 0 }
    }

    #[inline(always)]
    const fn mask(prio: OsPrio) -> u32 {
        1 << (prio - 1)
    }

    /// Insert a priority into the set
    #[inline]
    pub fn insert(&mut self, prio: OsPrio) {
        debug_assert!(prio >= 1 && prio <= 32);
        self.bits |= Self::mask(prio);
    }

    /// Remove a priority from the set
    #[inline]
    pub fn remove(&mut self, prio: OsPrio) {
        debug_assert!(prio >= 1 && prio <= 32);
        self.bits &= !Self::mask(prio);
    }

    /// Get the highest priority in the set, if any
    #[inline]
    pub fn highest(&self) -> Option<OsPrio> {
        match 32 - self.bits.leading_zeros() {
            0 => None,
            prio => Some(prio as OsPrio),
        }
    }

    /// Check if a specific priority is in the set
    #[inline]
    pub fn is_set(&self, prio: OsPrio) -> bool {
        prio >= 1 && (self.bits & Self::mask(prio)) != 0
    }

    /// Check if the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Raw bitmask
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Iterate from the highest priority down
    pub fn iter(&self) -> impl Iterator<Item = OsPrio> {
        let mut working = *self;
        core::iter::from_fn(move || {
            let prio = working.highest()?;
            working.remove(prio);
            Some(prio)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set() {
        let set = PrioSet::new();
        assert!(set.is_empty());
        assert_eq!(set.highest(), None);
        assert!(!set.is_set(0));
    }

    #[test]
    fn test_insert_remove() {
        let mut set = PrioSet::new();

        set.insert(5);
        assert!(set.is_set(5));
        assert!(!set.is_set(4));
        assert_eq!(set.highest(), Some(5));

        set.insert(3);
        assert_eq!(set.highest(), Some(5));

        set.remove(5);
        assert_eq!(set.highest(), Some(3));

        set.remove(3);
        assert!(set.is_empty());
    }

    #[test]
    fn test_boundary_priorities() {
        let mut set = PrioSet::new();

        set.insert(1);
        assert_eq!(set.bits(), 1);
        assert_eq!(set.highest(), Some(1));

        set.insert(32);
        assert_eq!(set.highest(), Some(32));

        set.remove(32);
        assert_eq!(set.highest(), Some(1));
    }

    #[test]
    fn test_iter_descending() {
        let mut set = PrioSet::new();
        set.insert(2);
        set.insert(11);
        set.insert(7);

        let mut order = [0u8; 3];
        for (slot, prio) in order.iter_mut().zip(set.iter()) {
            *slot = prio;
        }
        assert_eq!(order, [11, 7, 2]);
        assert_eq!(set.iter().count(), 3);
    }
}
