//! Trace and baggage augmentors
//!
//! Both read what the caller put on the [`Context`]: the active
//! [`SpanContext`](crate::SpanContext) and the propagated
//! [`Baggage`](crate::Baggage).

use crate::core::{object_at_path, Context, Entry, EntryAugmentor, Map, Member, StructuredValue};

/// Prefix of payload keys holding baggage members
pub const BAGGAGE_KEY_PREFIX: &str = "otel-baggage/";

/// Copies trace id, span id and the sampled flag into the entry
#[derive(Debug, Clone, Default)]
pub struct TraceAugmentor {
    project_id: Option<String>,
}

impl TraceAugmentor {
    /// Write the bare trace id
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the trace as `projects/<project_id>/traces/<trace_id>`, the
    /// form the log viewer links to traces with
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
        }
    }
}

impl EntryAugmentor for TraceAugmentor {
    fn augment(&self, ctx: &Context, entry: &mut Entry, _groups: &[String]) {
        let Some(span) = ctx.span() else {
            return;
        };

        if span.has_trace_id() {
            let trace_id = span.trace_id();
            entry.trace = Some(match &self.project_id {
                Some(project) => format!("projects/{}/traces/{}", project, trace_id),
                None => trace_id,
            });
        }
        if span.has_span_id() {
            entry.span_id = Some(span.span_id());
        }
        if span.is_sampled() {
            entry.trace_sampled = true;
        }
    }
}

/// Writes baggage members into the payload at the open group path
///
/// A member becomes its value when it has no properties, otherwise an object
/// `{"value": .., "properties": {name: value or null}}`. Baggage overwrites
/// attributes with the same key.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaggageAugmentor;

impl BaggageAugmentor {
    fn member_value(member: &Member) -> StructuredValue {
        if member.properties.is_empty() {
            return StructuredValue::from(member.value.as_str());
        }

        let properties: Map = member
            .properties
            .iter()
            .map(|p| {
                let value = match &p.value {
                    Some(v) => StructuredValue::from(v.as_str()),
                    None => StructuredValue::Null,
                };
                (p.key.clone(), value)
            })
            .collect();

        let mut fields = Map::new();
        fields.insert("value".to_string(), StructuredValue::from(member.value.as_str()));
        fields.insert("properties".to_string(), StructuredValue::Object(properties));
        StructuredValue::Object(fields)
    }
}

impl EntryAugmentor for BaggageAugmentor {
    fn augment(&self, ctx: &Context, entry: &mut Entry, groups: &[String]) {
        let Some(baggage) = ctx.baggage().filter(|b| !b.is_empty()) else {
            return;
        };

        let current = object_at_path(&mut entry.payload, groups);
        for member in baggage.members() {
            current.insert(
                format!("{}{}", BAGGAGE_KEY_PREFIX, member.key),
                Self::member_value(member),
            );
        }
    }
}
