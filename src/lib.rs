//! # gcloud-log-handler
//!
//! A structured logging handler that turns log records into Google Cloud
//! Logging entries.
//!
//! ## Features
//!
//! - **Structured payloads**: attributes and groups become a JSON payload
//! - **Severity mapping**: levels map onto the Cloud Logging severity scale
//! - **Labels**: request scoped labels travel on the [`Context`]
//! - **Tracing**: trace and span ids, sampling flag and baggage (`otel` feature)
//! - **Pod labels**: Kubernetes downward API labels (`k8s` feature)
//! - **Sinks**: JSON lines writer, in-memory sink, and a bounded background
//!   queue that never blocks the caller
//!
//! ## Example
//!
//! ```
//! use gcloud_log_handler::prelude::*;
//!
//! let sink = std::sync::Arc::new(MemorySink::new());
//! let handler = CloudHandler::builder(sink.clone())
//!     .log_level(Level::DEBUG)
//!     .build();
//! let logger = Logger::new(handler).with([Attribute::string("service", "api")]);
//!
//! logger.info("started", [Attribute::int("port", 8080)]);
//! assert_eq!(sink.entries().len(), 1);
//! ```

pub mod augmentors;
pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        AttrValue, Attribute, Baggage, CloudHandler, Context, Entry, EntryAugmentor, Handler,
        HandlerBuilder, HandlerError, Level, LevelVar, Leveler, Logger, Member, Property, Record,
        Result, Severity, Sink, SpanContext, StructuredValue,
    };
    pub use crate::sinks::{BufferedSink, Discard, JsonWriterSink, MemorySink};
}

pub use core::{
    AttrMapper, AttrValue, Attribute, Baggage, CancelHandle, CloudHandler, Context,
    ContextLabels, Discard, Entry, EntryAugmentor, ErrorValue, FnSink, Handler, HandlerBuilder,
    HandlerError, Label, LabelSource, Level, LevelVar, Leveler, LogValuer, Logger, Map, Member,
    ObjectValue, PayloadTree, Property, Record, Result, Serialized, Severity, Sink, SinkMetrics,
    SourceLocation, SpanContext, StructuredValue, LABELS_KEY, LEVEL_ENV_VAR, MAX_JSON_DEPTH,
    MAX_LABELS, MESSAGE_KEY, SOURCE_LOCATION_KEY, SPAN_ID_KEY, TRACE_KEY, TRACE_SAMPLED_KEY,
};
pub use sinks::{BufferedSink, BufferedSinkBuilder, JsonWriterSink, MemorySink};
