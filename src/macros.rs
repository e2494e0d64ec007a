//! Formatting macros over [`Logger::log_fmt`](crate::Logger::log_fmt).
//!
//! Arguments are rendered straight into the message buffer; nothing is
//! formatted when the level is filtered out.
//!
//! # Examples
//!
//! ```
//! use tidelog::prelude::*;
//! use tidelog::{info, warn};
//!
//! let service = Service::new();
//! let logger = service.create_logger(Vec::new(), "app", false).unwrap();
//!
//! info!(logger, "Server started");
//! let port = 8080;
//! warn!(logger, "Port {} already in use", port);
//! ```

/// Log at an explicit level.
///
/// ```
/// # use tidelog::prelude::*;
/// # let service = Service::new();
/// # let logger = service.create_logger(Vec::new(), "app", false).unwrap();
/// use tidelog::log;
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_fmt($level, format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message. Logging only; the process keeps running.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_macros_format_and_filter() {
        let service = Service::new();
        let memory = MemorySink::new("memory");
        let logger = service
            .create_logger(vec![SinkHandle::new(memory.clone())], "macros", false)
            .unwrap();
        logger.set_level(LogLevel::Debug);

        trace!(logger, "hidden {}", 0);
        debug!(logger, "debug {}", 1);
        info!(logger, "info {}", 2);
        warn!(logger, "warn {}", 3);
        error!(logger, "error {}", 4);
        fatal!(logger, "fatal {}", 5);
        log!(logger, LogLevel::Info, "plain");

        let lines = memory.lines();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].contains("[DEBUG]") && lines[0].contains("debug 1"));
        assert!(lines[4].contains("[FATAL]") && lines[4].contains("fatal 5"));
        assert!(lines[5].contains("plain"));
        assert!(lines.iter().all(|line| line.contains("macros.rs:")));
    }
}
