//! Kernel logging macros
//!
//! With the `defmt` feature every level forwards to the matching `defmt`
//! macro. Without it nothing is emitted, but the arguments are still
//! type-checked so that values used only for logging stay "used".
//!
//! Format strings must be valid for both `defmt` and `core::fmt`; stick to
//! `{}` and `{:x}` style placeholders.

#[doc(hidden)]
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! __os_log {
    (trace, $($arg:tt)*) => { defmt::trace!($($arg)*) };
    (debug, $($arg:tt)*) => { defmt::debug!($($arg)*) };
    (info, $($arg:tt)*) => { defmt::info!($($arg)*) };
    (warn, $($arg:tt)*) => { defmt::warn!($($arg)*) };
    (error, $($arg:tt)*) => { defmt::error!($($arg)*) };
}

#[doc(hidden)]
#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! __os_log {
    ($level:ident, $($arg:tt)*) => {
        if false {
            let _ = ::core::format_args!($($arg)*);
        }
    };
}

/// Trace message
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::__os_log!(trace, $($arg)*) };
}

/// Debug message
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__os_log!(debug, $($arg)*) };
}

/// Info message
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__os_log!(info, $($arg)*) };
}

/// Warning message
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__os_log!(warn, $($arg)*) };
}

/// Error message
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__os_log!(error, $($arg)*) };
}
