//! Error types
//!
//! Kernel operations return `OsResult`; the public entry points hand any
//! error to [`crate::kernel::os_error`], which halts the system.

/// Kernel error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // ============ Admission errors ============
    /// Periodic task table is full
    TaskTableFull = 10001,
    /// Sporadic task queue is full
    AperiodicQueueFull = 10002,
    /// Target priority slot is already occupied
    PrioExist = 10003,
    /// Invalid stack pointer
    StkInvalid = 10004,
    /// Stack smaller than the minimum context frame
    StkSizeInvalid = 10005,
    /// Periodic admission after the scheduler started
    OsRunning = 10006,
    /// Sporadic task descriptor is still pending in the queue
    TaskQueued = 10007,
    /// Zero period or deadline
    TimingInvalid = 10008,

    // ============ Protocol-usage errors ============
    /// Blocking primitive called from the idle task
    IdleTaskCall = 20001,
    /// Blocking primitive called from an interrupt handler
    IsrCall = 20002,
    /// Critical region nesting overflow
    NestingOvf = 20003,
    /// Caller is not a periodic task
    NotPeriodic = 20004,
    /// Caller is not the sporadic task at the head of the queue
    NotAperiodicHead = 20005,
    /// Task suspended or finished while holding a critical region
    RegionOpen = 20006,
    /// Scheduler has not been started
    OsNotRunning = 20007,
    /// Kernel has not been initialized
    OsNotInit = 20008,

    // ============ Invariant violations ============
    /// Scheduler found no task to run
    SchedNoTask = 30001,
    /// Bitmask or table state is inconsistent
    StateInvalid = 30002,
    /// Ceiling slot already held by another task
    CeilingOccupied = 30003,
    /// Task entry function returned or start returned
    FatalReturn = 30004,
}

/// Result type alias for kernel operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    /// Numeric error code
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }
}

impl core::fmt::Display for OsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}
