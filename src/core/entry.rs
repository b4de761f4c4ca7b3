//! Log records and backend entries
//!
//! A [`Record`] is what the application hands to a handler. An [`Entry`] is
//! what the handler hands to a sink: it is built fresh for every record and
//! never modified after that.

use super::attr::Attribute;
use super::log_level::Level;
use super::severity::Severity;
use super::value::Map;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::Location;

/// Key of the structured-logging JSON field carrying labels
pub const LABELS_KEY: &str = "logging.googleapis.com/labels";
pub const TRACE_KEY: &str = "logging.googleapis.com/trace";
pub const SPAN_ID_KEY: &str = "logging.googleapis.com/spanId";
pub const TRACE_SAMPLED_KEY: &str = "logging.googleapis.com/trace_sampled";
pub const SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";

const SEVERITY_KEY: &str = "severity";
const TIMESTAMP_KEY: &str = "timestamp";

/// Position of a log call in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    /// Serialized as a string, as the structured-logging agent expects
    #[serde(serialize_with = "serialize_line")]
    pub line: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub function: String,
}

fn serialize_line<S: Serializer>(line: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(line)
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// Location of the caller of a `#[track_caller]` function
    ///
    /// Caller locations carry no function name.
    pub fn from_caller(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line(), String::new())
    }
}

/// One record handed to a handler
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: DateTime<FixedOffset>,
    pub level: Level,
    pub message: String,
    pub attrs: Vec<Attribute>,
    pub source: Option<SourceLocation>,
}

impl Record {
    /// A record stamped with the current time
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: Utc::now().fixed_offset(),
            level,
            message: message.into(),
            attrs: Vec::new(),
            source: None,
        }
    }

    pub fn at(mut self, time: DateTime<FixedOffset>) -> Self {
        self.time = time;
        self
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attribute>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn add_attr(&mut self, attr: Attribute) {
        self.attrs.push(attr);
    }

    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }
}

/// An entry in the shape expected by Cloud Logging
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub payload: Map,
    pub labels: BTreeMap<String, String>,
    /// Trace resource name, or the bare trace id
    pub trace: Option<String>,
    pub span_id: Option<String>,
    pub trace_sampled: bool,
    pub source_location: Option<SourceLocation>,
}

impl Entry {
    pub fn new(timestamp: DateTime<Utc>, severity: Severity, payload: Map) -> Self {
        Self {
            timestamp,
            severity,
            payload,
            labels: BTreeMap::new(),
            trace: None,
            span_id: None,
            trace_sampled: false,
            source_location: None,
        }
    }

    /// Serialize as one line of structured-logging JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn is_reserved(key: &str) -> bool {
        key == SEVERITY_KEY || key == TIMESTAMP_KEY || key.starts_with("logging.googleapis.com/")
    }
}

impl Serialize for Entry {
    /// Payload fields at the top level next to the entry metadata
    ///
    /// Payload fields named like a metadata key are shadowed by the metadata.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(SEVERITY_KEY, &self.severity)?;
        map.serialize_entry(
            TIMESTAMP_KEY,
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        )?;

        for (key, value) in self.payload.iter().filter(|(key, _)| !Self::is_reserved(key)) {
            map.serialize_entry(key, value)?;
        }

        if !self.labels.is_empty() {
            map.serialize_entry(LABELS_KEY, &self.labels)?;
        }
        if let Some(trace) = &self.trace {
            map.serialize_entry(TRACE_KEY, trace)?;
        }
        if let Some(span_id) = &self.span_id {
            map.serialize_entry(SPAN_ID_KEY, span_id)?;
        }
        if self.trace_sampled {
            map.serialize_entry(TRACE_SAMPLED_KEY, &true)?;
        }
        if let Some(source) = &self.source_location {
            map.serialize_entry(SOURCE_LOCATION_KEY, source)?;
        }
        map.end()
    }
}
