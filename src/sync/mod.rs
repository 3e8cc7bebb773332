//! Synchronization primitives
//!
//! Contains the priority-ceiling counting semaphore.

pub mod sem;
