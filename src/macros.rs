//! Logging macros for ergonomic log message formatting.
//!
//! Two families, both recording the calling module as the function name:
//!
//! - printf-style (`debug!`, `info!`, `warn!`, `error!`, `panic_log!`,
//!   `fatal!`): a format string plus arguments, like `format!`.
//! - println-style (`debugln!` ... `fatalln!`): any number of `Display`
//!   values joined by single spaces.
//!
//! # Examples
//!
//! ```
//! use rust_tee_logger::{info, infoln, Logger};
//!
//! let logger = Logger::discard();
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! infoln!(logger, "listening on", port, "with", 4, "workers");
//! ```

/// Log a printf-style message at an explicit level.
///
/// # Examples
///
/// ```
/// # use rust_tee_logger::{Level, Logger};
/// # let logger = Logger::discard();
/// use rust_tee_logger::log;
/// log!(logger, Level::Info, "Simple message");
/// log!(logger, Level::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_args($level, ::std::format_args!($($arg)+), ::std::option::Option::Some(::std::module_path!()))
    };
}

/// Log a println-style message at an explicit level: the arguments are
/// rendered with `Display` and joined by spaces.
///
/// # Examples
///
/// ```
/// # use rust_tee_logger::{Level, Logger};
/// # let logger = Logger::discard();
/// use rust_tee_logger::logln;
/// logln!(logger, Level::Warn, "disk", 93, "% full");
/// ```
#[macro_export]
macro_rules! logln {
    ($logger:expr, $level:expr, $($arg:expr),+ $(,)?) => {{
        let parts: ::std::vec::Vec<::std::string::String> =
            ::std::vec![$(::std::string::ToString::to_string(&$arg)),+];
        $logger.log_args(
            $level,
            ::std::format_args!("{}", parts.join(" ")),
            ::std::option::Option::Some(::std::module_path!()),
        );
    }};
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use rust_tee_logger::Logger;
/// # let logger = Logger::discard();
/// use rust_tee_logger::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Error, $($arg)+)
    };
}

/// Log a panic-level message, then unwind under the conventional
/// termination policy.
///
/// Named `panic_log!` so it never shadows `std::panic!`.
#[macro_export]
macro_rules! panic_log {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Panic, $($arg)+)
    };
}

/// Log a fatal-level message, then sync and exit under the conventional
/// termination policy.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Fatal, $($arg)+)
    };
}

#[macro_export]
macro_rules! debugln {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::logln!($logger, $crate::Level::Debug, $($arg),+)
    };
}

#[macro_export]
macro_rules! infoln {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::logln!($logger, $crate::Level::Info, $($arg),+)
    };
}

#[macro_export]
macro_rules! warnln {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::logln!($logger, $crate::Level::Warn, $($arg),+)
    };
}

#[macro_export]
macro_rules! errorln {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::logln!($logger, $crate::Level::Error, $($arg),+)
    };
}

#[macro_export]
macro_rules! panicln {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::logln!($logger, $crate::Level::Panic, $($arg),+)
    };
}

#[macro_export]
macro_rules! fatalln {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $crate::logln!($logger, $crate::Level::Fatal, $($arg),+)
    };
}
