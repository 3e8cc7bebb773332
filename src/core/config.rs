//! Compile-time configuration
//!
//! These constants control the resource limits of the kernel.

/// Maximum number of admitted periodic tasks (idle excluded)
pub const CFG_PERIODIC_TASKS_MAX: usize = 10;

/// Maximum number of pending sporadic tasks
pub const CFG_APERIODIC_TASKS_MAX: usize = 10;

/// Maximum depth of nested critical regions held by one task
pub const CFG_CRITICAL_NESTING_MAX: usize = 10;

/// Idle task priority (lowest)
pub const CFG_PRIO_IDLE: u8 = 0;

/// Reserved priority of whichever task holds the ceiling slot
pub const CFG_PRIO_CEILING: u8 = (CFG_PERIODIC_TASKS_MAX + 1) as u8;

/// Number of slots in the task table: idle, periodic tasks, ceiling
pub const CFG_TASK_TBL_SIZE: usize = CFG_PERIODIC_TASKS_MAX + 2;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Core clock feeding SysTick
pub const CFG_CPU_CLOCK_HZ: u32 = 16_000_000;

/// Minimum task stack size in words
pub const CFG_STK_SIZE_MIN: usize = 32;

/// Idle task stack size in words
pub const CFG_IDLE_STK_SIZE: usize = 64;

/// Pattern painted over unused stack words
pub const CFG_STK_SENTINEL: u32 = 0xDEAD_BEEF;

// Every priority level above idle owns one bit of a `u32` set.
const _: () = assert!((CFG_PRIO_CEILING as usize) <= 32);
const _: () = assert!(CFG_STK_SIZE_MIN > crate::port::CONTEXT_STACK_SIZE + 1);
