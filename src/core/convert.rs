//! Attribute value resolution
//!
//! Maps every [`AttrValue`] kind onto the structured value model. A `None`
//! result means the value has no representation and the attribute is dropped;
//! it is never an error.

use super::attr::{AttrValue, Attribute, ObjectValue};
use super::timestamp::format_rfc3339_millis;
use super::value::{Map, StructuredValue};

/// Convert a value to its structured form
///
/// Lazy values are forced first. Integers, unsigned integers and durations
/// (in nanoseconds) widen to `f64`, so magnitudes above 2^53 lose precision.
pub fn to_structured(value: AttrValue) -> Option<StructuredValue> {
    match value.resolve() {
        AttrValue::Null => Some(StructuredValue::Null),
        AttrValue::String(s) => Some(StructuredValue::String(s)),
        AttrValue::Int64(i) => Some(StructuredValue::Number(i as f64)),
        AttrValue::Uint64(u) => Some(StructuredValue::Number(u as f64)),
        AttrValue::Float64(f) => Some(StructuredValue::Number(f)),
        AttrValue::Bool(b) => Some(StructuredValue::Bool(b)),
        AttrValue::Duration(d) => Some(StructuredValue::Number(d.as_nanos() as f64)),
        AttrValue::Time(t) => Some(StructuredValue::String(format_rfc3339_millis(&t))),
        AttrValue::Group(attrs) => group_to_structured(attrs),
        AttrValue::Any(object) => object_to_structured(object.as_ref()),
        // resolve() never hands back a lazy value
        AttrValue::Lazy(_) => None,
    }
}

/// An empty group, or one whose children were all dropped, has no value
fn group_to_structured(attrs: Vec<Attribute>) -> Option<StructuredValue> {
    if attrs.is_empty() {
        return None;
    }

    let mut fields = Map::new();
    for attr in attrs {
        decorate(&mut fields, attr);
    }

    if fields.is_empty() {
        None
    } else {
        Some(StructuredValue::Object(fields))
    }
}

fn object_to_structured(object: &dyn ObjectValue) -> Option<StructuredValue> {
    if let Some(err) = object.as_error() {
        if !object.has_json_form() {
            return Some(StructuredValue::String(err.to_string()));
        }
    }

    if let Some(value) = object.to_structured() {
        return Some(value);
    }

    object.to_json().ok().map(StructuredValue::from_json)
}

/// Write one attribute into `fields`
///
/// The elided marker is skipped. A group with an empty key is inlined: its
/// fields become siblings in `fields`. Anything else is stored under its key,
/// replacing an earlier value.
pub fn decorate(fields: &mut Map, attr: Attribute) {
    let Attribute { key, value } = attr;
    let value = value.resolve();
    let inline = key.is_empty() && value.is_group();
    if key.is_empty() && value.is_null() {
        return;
    }

    match to_structured(value) {
        Some(StructuredValue::Object(children)) if inline => fields.extend(children),
        Some(resolved) => {
            fields.insert(key, resolved);
        }
        None => {}
    }
}
