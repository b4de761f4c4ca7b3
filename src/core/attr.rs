//! Attributes attached to log calls
//!
//! An [`Attribute`] is a key plus an [`AttrValue`]. Values cover a fixed set of
//! kinds plus two open-ended ones: [`AttrValue::Any`] for application objects
//! and [`AttrValue::Lazy`] for values computed only when a record is actually
//! emitted.

use super::json_depth;
use super::value::StructuredValue;
use chrono::{DateTime, FixedOffset, TimeZone};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on chained lazy values resolved for one attribute
const MAX_LOG_VALUER_DEPTH: usize = 100;

/// A value computed on demand
///
/// [`Attribute::resolve`] calls `log_value` and keeps the result in place of
/// the lazy wrapper, so the computation happens at most once per attribute.
pub trait LogValuer: Send + Sync {
    fn log_value(&self) -> AttrValue;
}

impl<F> LogValuer for F
where
    F: Fn() -> AttrValue + Send + Sync,
{
    fn log_value(&self) -> AttrValue {
        self()
    }
}

/// An application object carried by [`AttrValue::Any`]
///
/// The resolver probes the capabilities in order: error message (unless the
/// object has its own JSON form), direct structured conversion, then a JSON
/// round trip. An object that fails all three is dropped.
pub trait ObjectValue: fmt::Debug + Send + Sync {
    /// Error view of the object, if it is one
    fn as_error(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }

    /// Whether the object defines its own JSON rendering
    ///
    /// An error with its own JSON rendering is rendered as JSON, not as its
    /// message.
    fn has_json_form(&self) -> bool {
        false
    }

    /// Direct conversion, skipping the JSON round trip
    fn to_structured(&self) -> Option<StructuredValue> {
        None
    }

    /// Marshal into a generic JSON tree
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;
}

/// Any serializable value
///
/// Marshalling stops at [`MAX_JSON_DEPTH`](super::json_depth::MAX_JSON_DEPTH)
/// levels, so a value that refers back to itself fails instead of recursing
/// without end.
pub struct Serialized<T>(pub T);

impl<T: Serialize> fmt::Debug for Serialized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match json_depth::to_string(&self.0) {
            Ok(json) => write!(f, "Serialized({})", json),
            Err(_) => f.write_str("Serialized(<unserializable>)"),
        }
    }
}

impl<T: Serialize + Send + Sync> ObjectValue for Serialized<T> {
    fn has_json_form(&self) -> bool {
        true
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        json_depth::to_value(&self.0)
    }
}

/// An error rendered as its message
#[derive(Debug)]
pub struct ErrorValue(pub Box<dyn std::error::Error + Send + Sync>);

impl ObjectValue for ErrorValue {
    fn as_error(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        Ok(serde_json::Value::Object(serde_json::Map::new()))
    }
}

impl ObjectValue for serde_json::Value {
    fn to_structured(&self) -> Option<StructuredValue> {
        Some(StructuredValue::from_json(self.clone()))
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        Ok(self.clone())
    }
}

impl ObjectValue for StructuredValue {
    fn to_structured(&self) -> Option<StructuredValue> {
        Some(self.clone())
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        Ok(self.to_json_value())
    }
}

#[derive(Clone, Default)]
pub enum AttrValue {
    /// Absent value
    #[default]
    Null,
    String(String),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Bool(bool),
    Duration(Duration),
    Time(DateTime<FixedOffset>),
    Group(Vec<Attribute>),
    Any(Arc<dyn ObjectValue>),
    Lazy(Arc<dyn LogValuer>),
}

impl AttrValue {
    /// Wrap any serializable value
    pub fn any<T: Serialize + Send + Sync + 'static>(value: T) -> Self {
        AttrValue::Any(Arc::new(Serialized(value)))
    }

    pub fn error<E: Into<Box<dyn std::error::Error + Send + Sync>>>(err: E) -> Self {
        AttrValue::Any(Arc::new(ErrorValue(err.into())))
    }

    pub fn object<O: ObjectValue + 'static>(object: O) -> Self {
        AttrValue::Any(Arc::new(object))
    }

    pub fn lazy<L: LogValuer + 'static>(valuer: L) -> Self {
        AttrValue::Lazy(Arc::new(valuer))
    }

    pub fn time<Tz: TimeZone>(t: DateTime<Tz>) -> Self {
        AttrValue::Time(t.fixed_offset())
    }

    pub fn group(attrs: impl IntoIterator<Item = Attribute>) -> Self {
        AttrValue::Group(attrs.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn is_group(&self) -> bool {
        matches!(self, AttrValue::Group(_))
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, AttrValue::Lazy(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AttrValue::Null => "Null",
            AttrValue::String(_) => "String",
            AttrValue::Int64(_) => "Int64",
            AttrValue::Uint64(_) => "Uint64",
            AttrValue::Float64(_) => "Float64",
            AttrValue::Bool(_) => "Bool",
            AttrValue::Duration(_) => "Duration",
            AttrValue::Time(_) => "Time",
            AttrValue::Group(_) => "Group",
            AttrValue::Any(_) => "Any",
            AttrValue::Lazy(_) => "Lazy",
        }
    }

    /// Force lazy values until a concrete one is reached
    ///
    /// A chain deeper than [`MAX_LOG_VALUER_DEPTH`] resolves to an error
    /// string instead of looping forever.
    pub fn resolve(self) -> AttrValue {
        let mut value = self;
        for _ in 0..MAX_LOG_VALUER_DEPTH {
            match value {
                AttrValue::Lazy(valuer) => value = valuer.log_value(),
                resolved => return resolved,
            }
        }
        if value.is_lazy() {
            AttrValue::String(format!(
                "lazy value not resolved after {} evaluations",
                MAX_LOG_VALUER_DEPTH
            ))
        } else {
            value
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => f.write_str("Null"),
            AttrValue::String(s) => f.debug_tuple("String").field(s).finish(),
            AttrValue::Int64(i) => f.debug_tuple("Int64").field(i).finish(),
            AttrValue::Uint64(u) => f.debug_tuple("Uint64").field(u).finish(),
            AttrValue::Float64(n) => f.debug_tuple("Float64").field(n).finish(),
            AttrValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            AttrValue::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            AttrValue::Time(t) => f.debug_tuple("Time").field(t).finish(),
            AttrValue::Group(attrs) => f.debug_tuple("Group").field(attrs).finish(),
            AttrValue::Any(object) => f.debug_tuple("Any").field(object).finish(),
            AttrValue::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl PartialEq for AttrValue {
    /// Object and lazy values compare by identity
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Null, AttrValue::Null) => true,
            (AttrValue::String(a), AttrValue::String(b)) => a == b,
            (AttrValue::Int64(a), AttrValue::Int64(b)) => a == b,
            (AttrValue::Uint64(a), AttrValue::Uint64(b)) => a == b,
            (AttrValue::Float64(a), AttrValue::Float64(b)) => a == b,
            (AttrValue::Bool(a), AttrValue::Bool(b)) => a == b,
            (AttrValue::Duration(a), AttrValue::Duration(b)) => a == b,
            (AttrValue::Time(a), AttrValue::Time(b)) => a == b,
            (AttrValue::Group(a), AttrValue::Group(b)) => a == b,
            (AttrValue::Any(a), AttrValue::Any(b)) => Arc::ptr_eq(a, b),
            (AttrValue::Lazy(a), AttrValue::Lazy(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int64(i)
    }
}

impl From<i32> for AttrValue {
    fn from(i: i32) -> Self {
        AttrValue::Int64(i64::from(i))
    }
}

impl From<u64> for AttrValue {
    fn from(u: u64) -> Self {
        AttrValue::Uint64(u)
    }
}

impl From<u32> for AttrValue {
    fn from(u: u32) -> Self {
        AttrValue::Uint64(u64::from(u))
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        AttrValue::Float64(f)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<Duration> for AttrValue {
    fn from(d: Duration) -> Self {
        AttrValue::Duration(d)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for AttrValue {
    fn from(t: DateTime<Tz>) -> Self {
        AttrValue::time(t)
    }
}

impl From<Vec<Attribute>> for AttrValue {
    fn from(attrs: Vec<Attribute>) -> Self {
        AttrValue::Group(attrs)
    }
}

impl From<serde_json::Value> for AttrValue {
    fn from(value: serde_json::Value) -> Self {
        AttrValue::object(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttrValue::Null)
    }
}

/// A key-value datum attached to a log call
///
/// The default attribute (empty key, [`AttrValue::Null`]) is the elided
/// marker: it is never written to a payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribute {
    pub key: String,
    pub value: AttrValue,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The elided marker
    pub fn elided() -> Self {
        Self::default()
    }

    pub fn is_elided(&self) -> bool {
        self.key.is_empty() && self.value.is_null()
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, AttrValue::String(value.into()))
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, AttrValue::Int64(value))
    }

    pub fn uint(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, AttrValue::Uint64(value))
    }

    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, AttrValue::Float64(value))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, AttrValue::Bool(value))
    }

    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self::new(key, AttrValue::Duration(value))
    }

    pub fn time<Tz: TimeZone>(key: impl Into<String>, value: DateTime<Tz>) -> Self {
        Self::new(key, AttrValue::time(value))
    }

    pub fn null(key: impl Into<String>) -> Self {
        Self::new(key, AttrValue::Null)
    }

    /// A named group; an empty name inlines the children into the parent
    pub fn group(key: impl Into<String>, attrs: impl IntoIterator<Item = Attribute>) -> Self {
        Self::new(key, AttrValue::group(attrs))
    }

    pub fn any<T: Serialize + Send + Sync + 'static>(key: impl Into<String>, value: T) -> Self {
        Self::new(key, AttrValue::any(value))
    }

    pub fn error<E: Into<Box<dyn std::error::Error + Send + Sync>>>(
        key: impl Into<String>,
        err: E,
    ) -> Self {
        Self::new(key, AttrValue::error(err))
    }

    pub fn object<O: ObjectValue + 'static>(key: impl Into<String>, object: O) -> Self {
        Self::new(key, AttrValue::object(object))
    }

    pub fn lazy<L: LogValuer + 'static>(key: impl Into<String>, valuer: L) -> Self {
        Self::new(key, AttrValue::lazy(valuer))
    }

    /// Force a lazy value; resolving a resolved attribute changes nothing
    pub fn resolve(self) -> Self {
        Self {
            key: self.key,
            value: self.value.resolve(),
        }
    }
}

impl<K: Into<String>, V: Into<AttrValue>> From<(K, V)> for Attribute {
    fn from((key, value): (K, V)) -> Self {
        Attribute::new(key, value)
    }
}
