//! Logger front-end
//!
//! [`Logger`] is the value applications pass around. It wraps a shared
//! [`Handler`] and records the call site of every log call.

use super::{
    attr::Attribute,
    context::Context,
    entry::{Record, SourceLocation},
    error::Result,
    handler::Handler,
    log_level::Level,
};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

#[derive(Clone)]
pub struct Logger {
    handler: Arc<dyn Handler>,
}

impl Logger {
    #[must_use]
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    #[must_use]
    pub fn from_handler(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Logger whose entries also carry `attrs`
    #[must_use]
    pub fn with(&self, attrs: impl IntoIterator<Item = Attribute>) -> Self {
        let attrs: Vec<Attribute> = attrs.into_iter().collect();
        if attrs.is_empty() {
            return self.clone();
        }
        Self {
            handler: self.handler.with_attrs(attrs),
        }
    }

    /// Logger whose attributes are nested under `name`
    #[must_use]
    pub fn with_group(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }
        Self {
            handler: self.handler.with_group(name),
        }
    }

    pub fn enabled(&self, ctx: &Context, level: Level) -> bool {
        self.handler.enabled(ctx, level)
    }

    /// Log `message` at `level`, recording the caller's location
    #[track_caller]
    pub fn log(
        &self,
        ctx: &Context,
        level: Level,
        message: impl Into<String>,
        attrs: impl IntoIterator<Item = Attribute>,
    ) {
        if !self.handler.enabled(ctx, level) {
            return;
        }
        let record = Record::new(level, message)
            .with_attrs(attrs)
            .with_source(SourceLocation::from_caller(Location::caller()));
        self.log_record(ctx, record);
    }

    /// Hand a prepared record to the handler
    ///
    /// Handler errors are reported on stderr and never reach the caller.
    pub fn log_record(&self, ctx: &Context, record: Record) {
        if let Err(e) = self.handler.handle(ctx, record) {
            eprintln!("[LOGGER ERROR] Handler failed: {}", e);
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.handler.flush()
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attribute>) {
        self.log(&Context::background(), Level::DEBUG, message, attrs);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attribute>) {
        self.log(&Context::background(), Level::INFO, message, attrs);
    }

    #[inline]
    #[track_caller]
    pub fn notice(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attribute>) {
        self.log(&Context::background(), Level::NOTICE, message, attrs);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attribute>) {
        self.log(&Context::background(), Level::WARN, message, attrs);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attribute>) {
        self.log(&Context::background(), Level::ERROR, message, attrs);
    }

    /// Logged synchronously
    #[inline]
    #[track_caller]
    pub fn critical(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attribute>) {
        self.log(&Context::background(), Level::CRITICAL, message, attrs);
    }

    #[inline]
    #[track_caller]
    pub fn alert(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attribute>) {
        self.log(&Context::background(), Level::ALERT, message, attrs);
    }

    #[inline]
    #[track_caller]
    pub fn emergency(&self, message: impl Into<String>, attrs: impl IntoIterator<Item = Attribute>) {
        self.log(&Context::background(), Level::EMERGENCY, message, attrs);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logger")
    }
}
