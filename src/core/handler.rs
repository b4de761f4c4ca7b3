//! Cloud Logging handler
//!
//! [`CloudHandler`] turns records into [`Entry`] values and hands them to a
//! [`Sink`]. Handlers are immutable: `with_attrs`, `with_group` and
//! `with_leveler` return new handlers that share configuration with their
//! parent but own a private copy of the accumulated payload.

use super::{
    attr::Attribute,
    context::{Context, ContextLabels, LabelSource},
    convert::decorate,
    entry::{Entry, Record},
    error::Result,
    log_level::{Level, Leveler},
    payload::PayloadTree,
    rewrite::{self, AttrMapper},
    severity::Severity,
    sink::Sink,
};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;

/// Payload key of the log message
pub const MESSAGE_KEY: &str = "message";

/// Environment variable read by [`HandlerBuilder::log_level_from_env`]
pub const LEVEL_ENV_VAR: &str = "GCLOUD_LOG_LEVEL";

/// Receiver of records
pub trait Handler: Send + Sync {
    /// Whether records at `level` would be emitted
    fn enabled(&self, ctx: &Context, level: Level) -> bool;

    /// Emit one record
    ///
    /// Problems with individual attributes never fail the call.
    fn handle(&self, ctx: &Context, record: Record) -> Result<()>;

    fn with_attrs(&self, attrs: Vec<Attribute>) -> Arc<dyn Handler>;

    fn with_group(&self, name: &str) -> Arc<dyn Handler>;

    /// Block until buffered entries are delivered
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Hook that enriches an entry after it is built
///
/// Augmentors run in registration order and receive the handler's open
/// group path. An augmentor that has nothing to add leaves the entry alone.
pub trait EntryAugmentor: Send + Sync {
    fn augment(&self, ctx: &Context, entry: &mut Entry, groups: &[String]);
}

impl<F> EntryAugmentor for F
where
    F: Fn(&Context, &mut Entry, &[String]) + Send + Sync,
{
    fn augment(&self, ctx: &Context, entry: &mut Entry, groups: &[String]) {
        self(ctx, entry, groups)
    }
}

#[derive(Clone)]
pub struct CloudHandler {
    sink: Arc<dyn Sink>,
    leveler: Arc<dyn Leveler>,
    add_source: bool,
    augmentors: Arc<[Arc<dyn EntryAugmentor>]>,
    replace_attr: Option<AttrMapper>,
    label_source: Arc<dyn LabelSource>,
    payload: PayloadTree,
}

impl CloudHandler {
    pub fn builder(sink: impl Sink + 'static) -> HandlerBuilder {
        HandlerBuilder::new(sink)
    }

    /// Handler with default configuration
    pub fn new(sink: impl Sink + 'static) -> Self {
        HandlerBuilder::new(sink).build()
    }

    /// Current minimum level
    pub fn level(&self) -> Level {
        self.leveler.level()
    }

    pub fn groups(&self) -> &[String] {
        self.payload.groups()
    }

    /// Copy of this handler using `leveler` as its minimum level
    #[must_use]
    pub fn with_leveler(&self, leveler: impl Leveler + 'static) -> Self {
        Self {
            leveler: Arc::new(leveler),
            ..self.clone()
        }
    }

    /// Copy of this handler with `attrs` added at the open group path
    #[must_use]
    pub fn with_attrs(&self, attrs: impl IntoIterator<Item = Attribute>) -> Self {
        Self {
            payload: self.payload.with_attrs(attrs, self.replace_attr.as_ref()),
            ..self.clone()
        }
    }

    /// Copy of this handler with `name` appended to the open group path
    ///
    /// An empty name returns an equivalent handler.
    #[must_use]
    pub fn with_group(&self, name: &str) -> Self {
        Self {
            payload: self.payload.with_group(name),
            ..self.clone()
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.leveler.level() <= level
    }

    /// Build and dispatch the entry of one record
    ///
    /// Records at [`Severity::CRITICAL`] or above go through the sink's
    /// synchronous path; a failure there is reported on stderr. Everything
    /// else is buffered.
    pub fn handle(&self, ctx: &Context, record: Record) -> Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }

        let Record {
            time,
            level,
            message,
            attrs,
            source,
        } = record;

        let mut payload = self.payload.record_payload(attrs, self.replace_attr.as_ref());

        let message_attr = Attribute::string(MESSAGE_KEY, message.as_str());
        let no_groups: &[String] = &[];
        let message_attr = match &self.replace_attr {
            Some(mapper) => mapper(no_groups, message_attr),
            None => message_attr,
        };
        decorate(&mut payload, message_attr);

        let mut entry = Entry::new(time.with_timezone(&Utc), Severity::from_level(level), payload);
        entry.labels = self.label_source.labels_for(ctx);

        if self.add_source {
            entry.source_location = source;
        }

        for augmentor in self.augmentors.iter() {
            augmentor.augment(ctx, &mut entry, self.payload.groups());
        }

        if entry.severity >= Severity::CRITICAL {
            if let Err(e) = self.sink.log_sync(ctx, entry) {
                eprintln!(
                    "[LOGGER ERROR] Sink '{}' failed to deliver entry '{}': {}",
                    self.sink.name(),
                    message,
                    e
                );
            }
        } else {
            self.sink.log(entry);
        }

        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.sink.flush()
    }
}

impl Handler for CloudHandler {
    fn enabled(&self, _ctx: &Context, level: Level) -> bool {
        CloudHandler::enabled(self, level)
    }

    fn handle(&self, ctx: &Context, record: Record) -> Result<()> {
        CloudHandler::handle(self, ctx, record)
    }

    fn with_attrs(&self, attrs: Vec<Attribute>) -> Arc<dyn Handler> {
        Arc::new(CloudHandler::with_attrs(self, attrs))
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        Arc::new(CloudHandler::with_group(self, name))
    }

    fn flush(&self) -> Result<()> {
        CloudHandler::flush(self)
    }
}

impl fmt::Debug for CloudHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudHandler")
            .field("sink", &self.sink.name())
            .field("level", &self.leveler.level())
            .field("add_source", &self.add_source)
            .field("augmentors", &self.augmentors.len())
            .field("replace_attr", &self.replace_attr.is_some())
            .field("payload", &self.payload)
            .finish()
    }
}

/// Builder for [`CloudHandler`]
///
/// The minimum level is, by priority: an explicit level or leveler, the
/// level from the environment, the default level, then [`Level::INFO`].
///
/// # Example
/// ```
/// use gcloud_log_handler::prelude::*;
///
/// let handler = CloudHandler::builder(Discard)
///     .log_level_from_env()
///     .default_log_level(Level::DEBUG)
///     .add_source()
///     .build();
/// ```
pub struct HandlerBuilder {
    sink: Arc<dyn Sink>,
    explicit_level: Option<Arc<dyn Leveler>>,
    env_level: Option<Level>,
    default_level: Option<Level>,
    add_source: bool,
    replace_attr: Option<AttrMapper>,
    augmentors: Vec<Arc<dyn EntryAugmentor>>,
    label_source: Arc<dyn LabelSource>,
}

impl HandlerBuilder {
    pub fn new(sink: impl Sink + 'static) -> Self {
        Self::with_shared_sink(Arc::new(sink))
    }

    /// Builder over a sink that other handlers or code also hold
    pub fn with_shared_sink(sink: Arc<dyn Sink>) -> Self {
        Self {
            sink,
            explicit_level: None,
            env_level: None,
            default_level: None,
            add_source: false,
            replace_attr: None,
            augmentors: Vec::new(),
            label_source: Arc::new(ContextLabels),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn log_level(self, level: Level) -> Self {
        self.leveler(level)
    }

    /// Use a dynamic minimum level, such as a shared [`LevelVar`](super::log_level::LevelVar)
    #[must_use = "builder methods return a new value"]
    pub fn leveler(mut self, leveler: impl Leveler + 'static) -> Self {
        self.explicit_level = Some(Arc::new(leveler));
        self
    }

    /// Read the minimum level from `GCLOUD_LOG_LEVEL`
    #[must_use = "builder methods return a new value"]
    pub fn log_level_from_env(self) -> Self {
        self.log_level_from_env_var(LEVEL_ENV_VAR)
    }

    /// Read the minimum level from the environment variable `key`
    ///
    /// The value is an integer or a level name such as `DEBUG` or `WARN`.
    /// An unset variable is ignored; an unparsable one is ignored with a
    /// warning.
    #[must_use = "builder methods return a new value"]
    pub fn log_level_from_env_var(mut self, key: &str) -> Self {
        if let Ok(value) = std::env::var(key) {
            match value.parse::<Level>() {
                Ok(level) => self.env_level = Some(level),
                Err(e) => eprintln!(
                    "[LOGGER WARNING] Ignoring {}: {}. Falling back to the default level.",
                    key, e
                ),
            }
        }
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn default_log_level(mut self, level: Level) -> Self {
        self.default_level = Some(level);
        self
    }

    /// Attach the source location of each record
    #[must_use = "builder methods return a new value"]
    pub fn add_source(mut self) -> Self {
        self.add_source = true;
        self
    }

    /// Rewrite attributes before they are written
    #[must_use = "builder methods return a new value"]
    pub fn replace_attr<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&[String], Attribute) -> Attribute + Send + Sync + 'static,
    {
        self.replace_attr = Some(Arc::new(mapper));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn augmentor(mut self, augmentor: impl EntryAugmentor + 'static) -> Self {
        self.augmentors.push(Arc::new(augmentor));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn label_source(mut self, source: impl LabelSource + 'static) -> Self {
        self.label_source = Arc::new(source);
        self
    }

    /// Copy trace and span ids from the context
    #[cfg(feature = "otel")]
    #[must_use = "builder methods return a new value"]
    pub fn otel_tracing(self) -> Self {
        self.augmentor(crate::augmentors::otel::TraceAugmentor::new())
    }

    /// Like [`otel_tracing`](Self::otel_tracing), with trace ids written as
    /// `projects/<project_id>/traces/<trace_id>`
    #[cfg(feature = "otel")]
    #[must_use = "builder methods return a new value"]
    pub fn otel_tracing_for_project(self, project_id: impl Into<String>) -> Self {
        self.augmentor(crate::augmentors::otel::TraceAugmentor::for_project(project_id))
    }

    /// Copy baggage members from the context into the payload
    #[cfg(feature = "otel")]
    #[must_use = "builder methods return a new value"]
    pub fn otel_baggage(self) -> Self {
        self.augmentor(crate::augmentors::otel::BaggageAugmentor)
    }

    /// Label entries with the pod labels found in `<root>/labels`
    #[cfg(feature = "k8s")]
    #[must_use = "builder methods return a new value"]
    pub fn podinfo_labels(self, root: impl AsRef<std::path::Path>) -> Self {
        self.augmentor(crate::augmentors::k8s::PodinfoLabels::load(root))
    }

    pub fn build(self) -> CloudHandler {
        let leveler: Arc<dyn Leveler> = match (self.explicit_level, self.env_level, self.default_level) {
            (Some(explicit), _, _) => explicit,
            (None, Some(env), _) => Arc::new(env),
            (None, None, Some(default)) => Arc::new(default),
            (None, None, None) => Arc::new(Level::INFO),
        };

        CloudHandler {
            sink: self.sink,
            leveler,
            add_source: self.add_source,
            augmentors: self.augmentors.into(),
            replace_attr: rewrite::wrap(self.replace_attr),
            label_source: self.label_source,
            payload: PayloadTree::new(),
        }
    }
}
