//! Core handler types and traits

pub mod attr;
pub mod context;
pub mod convert;
pub mod entry;
pub mod error;
pub mod handler;
pub mod json_depth;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod payload;
pub mod rewrite;
pub mod severity;
pub mod sink;
pub mod timestamp;
pub mod value;

pub use attr::{AttrValue, Attribute, ErrorValue, LogValuer, ObjectValue, Serialized};
pub use context::{
    Baggage, CancelHandle, Context, ContextLabels, Label, LabelSource, Member, Property,
    SpanContext, MAX_LABELS,
};
pub use convert::{decorate, to_structured};
pub use entry::{
    Entry, Record, SourceLocation, LABELS_KEY, SOURCE_LOCATION_KEY, SPAN_ID_KEY, TRACE_KEY,
    TRACE_SAMPLED_KEY,
};
pub use error::{HandlerError, Result};
pub use handler::{
    CloudHandler, EntryAugmentor, Handler, HandlerBuilder, LEVEL_ENV_VAR, MESSAGE_KEY,
};
pub use json_depth::MAX_JSON_DEPTH;
pub use log_level::{Level, LevelVar, Leveler};
pub use logger::Logger;
pub use metrics::SinkMetrics;
pub use payload::{insert_at_path, PayloadTree};
pub use rewrite::AttrMapper;
pub use severity::Severity;
pub use sink::{Discard, FnSink, Sink};
pub use timestamp::format_rfc3339_millis;
pub use value::{object_at_path, object_entry, Map, StructuredValue};
