//! Core type definitions
//!
//! These types provide strong typing for kernel primitives.

/// Task priority (0 = idle, larger = higher priority)
pub type OsPrio = u8;

/// Tick counter type
pub type OsTick = u32;

/// Semaphore counter type
pub type OsSemCtr = u32;

/// Nesting counter
pub type OsNestingCtr = u8;

/// Stack element type
pub type OsStkElement = u32;

/// How a task was admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsTaskKind {
    /// Not registered with the kernel
    Unused = 0,
    /// The idle task, priority 0
    Idle = 1,
    /// Released every period with a static priority
    Periodic = 2,
    /// Event-triggered, queued FIFO below all periodic tasks
    Aperiodic = 3,
}

/// Task state as seen by the scheduler
///
/// Derived from the kernel bitmasks and sporadic queue, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OsTaskState {
    /// Task is ready to run
    Ready = 0,
    /// Task is in a timed delay
    Delayed = 1,
    /// Periodic task finished its iteration and awaits its next release
    WaitingNextPeriod = 2,
    /// Sporadic task waiting behind the head of the queue
    Queued = 3,
    /// Task is not known to the kernel
    Dormant = 4,
}
