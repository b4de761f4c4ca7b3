//! Logging macros for ergonomic log message formatting.
//!
//! Each macro takes a [`Logger`](crate::Logger), an optional `ctx: <expr>`
//! argument naming a [`Context`](crate::Context), and `format!` style
//! arguments. Formatting is skipped when the level is disabled, and the
//! call site (file, line, module path) is attached to the record.
//!
//! # Examples
//!
//! ```
//! use gcloud_log_handler::prelude::*;
//! use gcloud_log_handler::info;
//!
//! let logger = Logger::new(CloudHandler::new(Discard));
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! let ctx = Context::background().with_labels([("request", "r-1")]);
//! info!(logger, ctx: &ctx, "Handling request {}", 42);
//! ```

/// Log a formatted message at an arbitrary level.
///
/// # Examples
///
/// ```
/// # use gcloud_log_handler::prelude::*;
/// # let logger = Logger::new(CloudHandler::new(Discard));
/// use gcloud_log_handler::log;
/// log!(logger, Level::INFO, "Simple message");
/// log!(logger, Level(5), "Between WARN and ERROR: {}", 5);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, ctx: $ctx:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let ctx: &$crate::Context = $ctx;
        let level: $crate::Level = $level;
        if logger.enabled(ctx, level) {
            let record = $crate::Record::new(level, format!($($arg)+)).with_source(
                $crate::SourceLocation::new(file!(), line!(), module_path!()),
            );
            logger.log_record(ctx, record);
        }
    }};
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $crate::log!($logger, ctx: &$crate::Context::background(), $level, $($arg)+)
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use gcloud_log_handler::prelude::*;
/// # let logger = Logger::new(CloudHandler::builder(Discard).log_level(Level::DEBUG).build());
/// use gcloud_log_handler::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, ctx: $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, ctx: $ctx, $crate::Level::DEBUG, $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::DEBUG, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use gcloud_log_handler::prelude::*;
/// # let logger = Logger::new(CloudHandler::new(Discard));
/// use gcloud_log_handler::info;
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, ctx: $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, ctx: $ctx, $crate::Level::INFO, $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::INFO, $($arg)+)
    };
}

/// Log a notice-level message: normal but significant events.
#[macro_export]
macro_rules! notice {
    ($logger:expr, ctx: $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, ctx: $ctx, $crate::Level::NOTICE, $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::NOTICE, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use gcloud_log_handler::prelude::*;
/// # let logger = Logger::new(CloudHandler::new(Discard));
/// use gcloud_log_handler::warn;
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, ctx: $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, ctx: $ctx, $crate::Level::WARN, $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::WARN, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, ctx: $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, ctx: $ctx, $crate::Level::ERROR, $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::ERROR, $($arg)+)
    };
}

/// Log a critical-level message. The call blocks until the sink
/// acknowledges the entry.
#[macro_export]
macro_rules! critical {
    ($logger:expr, ctx: $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, ctx: $ctx, $crate::Level::CRITICAL, $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::CRITICAL, $($arg)+)
    };
}

#[macro_export]
macro_rules! alert {
    ($logger:expr, ctx: $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, ctx: $ctx, $crate::Level::ALERT, $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::ALERT, $($arg)+)
    };
}

#[macro_export]
macro_rules! emergency {
    ($logger:expr, ctx: $ctx:expr, $($arg:tt)+) => {
        $crate::log!($logger, ctx: $ctx, $crate::Level::EMERGENCY, $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::EMERGENCY, $($arg)+)
    };
}
