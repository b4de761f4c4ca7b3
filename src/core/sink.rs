//! Sink trait for entry delivery

use super::context::Context;
use super::entry::Entry;
use super::error::Result;
use std::fmt;

/// Transport that delivers entries to the logging backend
///
/// `log` buffers and returns immediately; whatever goes wrong afterwards is
/// the sink's to handle. `log_sync` returns once the entry is acknowledged or
/// the context is cancelled, whichever happens first.
pub trait Sink: Send + Sync {
    fn log(&self, entry: Entry);

    fn log_sync(&self, ctx: &Context, entry: Entry) -> Result<()>;

    /// Block until buffered entries are delivered
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "sink"
    }
}

impl<S: Sink + ?Sized> Sink for std::sync::Arc<S> {
    fn log(&self, entry: Entry) {
        (**self).log(entry)
    }

    fn log_sync(&self, ctx: &Context, entry: Entry) -> Result<()> {
        (**self).log_sync(ctx, entry)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Sink backed by a closure, used for both buffered and synchronous delivery
///
/// # Example
///
/// ```
/// use gcloud_log_handler::{CloudHandler, FnSink};
///
/// let handler = CloudHandler::builder(FnSink::new(|entry| {
///     println!("{}", entry.severity);
/// }))
/// .build();
/// ```
pub struct FnSink<F> {
    f: F,
}

impl<F> FnSink<F>
where
    F: Fn(Entry) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSink")
    }
}

impl<F> Sink for FnSink<F>
where
    F: Fn(Entry) + Send + Sync,
{
    fn log(&self, entry: Entry) {
        (self.f)(entry)
    }

    fn log_sync(&self, _ctx: &Context, entry: Entry) -> Result<()> {
        (self.f)(entry);
        Ok(())
    }

    fn name(&self) -> &str {
        "fn"
    }
}

/// Sink that drops every entry
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Sink for Discard {
    fn log(&self, _entry: Entry) {}

    fn log_sync(&self, _ctx: &Context, _entry: Entry) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "discard"
    }
}
