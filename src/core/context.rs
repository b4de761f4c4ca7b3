//! Request-scoped context
//!
//! This module provides:
//! - `Context`: explicit per-call context carrying labels, trace data,
//!   baggage and cancellation
//! - `Label`: a key/value pair attached to every entry logged under a context
//! - `CancelHandle`: RAII handle that cancels a derived context
//! - `LabelSource`: how a handler obtains the labels of a context

use super::error::{HandlerError, Result};
use crossbeam_channel::{bounded, Receiver, Select, SelectedOperation, Sender, TryRecvError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Maximum number of labels extracted from one context
pub const MAX_LABELS: usize = 64;

/// A label attached to entries logged under a context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<(K, V)> for Label {
    fn from((key, value): (K, V)) -> Self {
        Label::new(key, value)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// One `with_labels` call, linked to the scope it was derived from
#[derive(Debug)]
struct LabelScope {
    parent: Option<Arc<LabelScope>>,
    labels: Vec<Label>,
}

/// Trace identity of the active span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanContext {
    trace_id: u128,
    span_id: u64,
    sampled: bool,
}

impl SpanContext {
    pub const fn new(trace_id: u128, span_id: u64, sampled: bool) -> Self {
        Self {
            trace_id,
            span_id,
            sampled,
        }
    }

    /// Parse hex encoded identifiers, as carried by a `traceparent` header
    pub fn from_hex(trace_id: &str, span_id: &str, sampled: bool) -> Result<Self> {
        let trace_id = u128::from_str_radix(trace_id, 16)
            .map_err(|e| HandlerError::config("span context", format!("trace id: {}", e)))?;
        let span_id = u64::from_str_radix(span_id, 16)
            .map_err(|e| HandlerError::config("span context", format!("span id: {}", e)))?;
        Ok(Self::new(trace_id, span_id, sampled))
    }

    pub fn has_trace_id(&self) -> bool {
        self.trace_id != 0
    }

    pub fn has_span_id(&self) -> bool {
        self.span_id != 0
    }

    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// 32 lowercase hex digits
    pub fn trace_id(&self) -> String {
        format!("{:032x}", self.trace_id)
    }

    /// 16 lowercase hex digits
    pub fn span_id(&self) -> String {
        format!("{:016x}", self.span_id)
    }
}

/// Metadata attached to a baggage member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub key: String,
    pub value: Option<String>,
}

impl Property {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// A property that is present but carries no value
    pub fn key_only(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub key: String,
    pub value: String,
    pub properties: Vec<Property>,
}

impl Member {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }
}

/// Propagated name/value pairs, keyed by member name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baggage {
    members: BTreeMap<String, Member>,
}

impl Baggage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member, replacing one with the same key
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.insert(member.key.clone(), member);
        self
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn member(&self, key: &str) -> Option<&Member> {
        self.members.get(key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<Member> for Baggage {
    fn from_iter<I: IntoIterator<Item = Member>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Baggage::new(), |baggage, member| baggage.with_member(member))
    }
}

/// Context passed explicitly to every log call
///
/// Cloning is cheap. Every `with_*` method returns a derived context and
/// leaves the receiver unchanged.
///
/// # Example
///
/// ```
/// use gcloud_log_handler::{Context, Label};
///
/// let outer = Context::background().with_labels([Label::new("a", "1"), Label::new("b", "1")]);
/// let inner = outer.with_labels([Label::new("b", "2")]);
///
/// let labels = inner.labels();
/// assert_eq!(labels["a"], "1");
/// assert_eq!(labels["b"], "2");
/// assert_eq!(outer.labels()["b"], "1");
/// ```
#[derive(Clone, Default)]
pub struct Context {
    labels: Option<Arc<LabelScope>>,
    span: Option<SpanContext>,
    baggage: Option<Arc<Baggage>>,
    cancel: Vec<Receiver<()>>,
    deadline: Option<Instant>,
}

impl Context {
    /// The empty root context
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context whose entries also carry `labels`
    ///
    /// Labels of this scope override same-key labels of enclosing scopes.
    pub fn with_labels<I, L>(&self, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        let mut derived = self.clone();
        derived.labels = Some(Arc::new(LabelScope {
            parent: self.labels.clone(),
            labels: labels.into_iter().map(Into::into).collect(),
        }));
        derived
    }

    pub fn with_span(&self, span: SpanContext) -> Self {
        let mut derived = self.clone();
        derived.span = Some(span);
        derived
    }

    pub fn with_baggage(&self, baggage: Baggage) -> Self {
        let mut derived = self.clone();
        derived.baggage = Some(Arc::new(baggage));
        derived
    }

    /// Derive a cancellable context
    ///
    /// The returned handle cancels the derived context, and every context
    /// derived from it, when [`CancelHandle::cancel`] is called or the handle
    /// is dropped.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (sender, receiver) = bounded(0);
        let mut derived = self.clone();
        derived.cancel.push(receiver);
        (
            derived,
            CancelHandle {
                sender: Mutex::new(Some(sender)),
            },
        )
    }

    /// Derive a context that expires at `deadline`, or earlier if this one
    /// already expires earlier
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut derived = self.clone();
        derived.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        derived
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn span(&self) -> Option<&SpanContext> {
        self.span.as_ref()
    }

    pub fn baggage(&self) -> Option<&Baggage> {
        self.baggage.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancelled explicitly or past its deadline
    pub fn is_cancelled(&self) -> bool {
        self.cancel_error().is_some()
    }

    fn cancel_error(&self) -> Option<HandlerError> {
        if self
            .cancel
            .iter()
            .any(|rx| matches!(rx.try_recv(), Err(TryRecvError::Disconnected)))
        {
            return Some(HandlerError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(HandlerError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Labels of every scope, outermost first, inner scopes winning
    ///
    /// At most [`MAX_LABELS`] distinct keys are kept; further keys are
    /// ignored with a warning.
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut scopes = Vec::new();
        let mut scope = self.labels.as_deref();
        while let Some(current) = scope {
            scopes.push(current);
            scope = current.parent.as_deref();
        }

        let mut labels = BTreeMap::new();
        for current in scopes.into_iter().rev() {
            for label in &current.labels {
                if labels.len() >= MAX_LABELS && !labels.contains_key(&label.key) {
                    eprintln!("[LOGGER WARNING] Too many labels, ignored: {}", label);
                    continue;
                }
                labels.insert(label.key.clone(), label.value.clone());
            }
        }
        labels
    }

    /// Block until `rx` yields a value, the context is cancelled, or its
    /// deadline passes
    ///
    /// A disconnected `rx` is reported as [`HandlerError::SinkStopped`].
    pub fn wait_for<T>(&self, rx: &Receiver<T>) -> Result<T> {
        if let Some(err) = self.cancel_error() {
            return Err(err);
        }

        let mut select = Select::new();
        let index = select.recv(rx);
        let operation = self.select_or_cancel(select, index)?;
        operation.recv(rx).map_err(|_| HandlerError::SinkStopped)
    }

    /// Block until `value` is queued on `tx`, the context is cancelled, or
    /// its deadline passes
    ///
    /// A disconnected `tx` is reported as [`HandlerError::SinkStopped`].
    /// The value is dropped when the send does not happen.
    pub fn send_to<T>(&self, tx: &Sender<T>, value: T) -> Result<()> {
        if let Some(err) = self.cancel_error() {
            return Err(err);
        }

        let mut select = Select::new();
        let index = select.send(tx);
        let operation = self.select_or_cancel(select, index)?;
        operation
            .send(tx, value)
            .map_err(|_| HandlerError::SinkStopped)
    }

    /// Add the cancel channels to `select` and wait; anything other than
    /// operation `index` becoming ready is an error
    fn select_or_cancel<'a>(
        &'a self,
        mut select: Select<'a>,
        index: usize,
    ) -> Result<SelectedOperation<'a>> {
        let first_cancel = index + 1;
        for cancel in &self.cancel {
            select.recv(cancel);
        }

        let operation = match self.deadline {
            Some(deadline) => select
                .select_deadline(deadline)
                .map_err(|_| HandlerError::DeadlineExceeded)?,
            None => select.select(),
        };

        if operation.index() == index {
            return Ok(operation);
        }

        // Cancel channels never carry values; completing the operation
        // only observes the disconnect.
        let cancel = &self.cancel[operation.index() - first_cancel];
        let _ = operation.recv(cancel);
        Err(HandlerError::Cancelled)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("labels", &self.labels())
            .field("span", &self.span)
            .field("baggage", &self.baggage)
            .field("cancellable", &!self.cancel.is_empty())
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Cancels the context returned alongside it by [`Context::with_cancel`]
#[derive(Debug)]
pub struct CancelHandle {
    sender: Mutex<Option<Sender<()>>>,
}

impl CancelHandle {
    /// Cancel the context; calling it again has no effect
    pub fn cancel(&self) {
        self.sender.lock().take();
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Source of the labels of each entry
pub trait LabelSource: Send + Sync {
    fn labels_for(&self, ctx: &Context) -> BTreeMap<String, String>;
}

/// Labels attached with [`Context::with_labels`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextLabels;

impl LabelSource for ContextLabels {
    fn labels_for(&self, ctx: &Context) -> BTreeMap<String, String> {
        ctx.labels()
    }
}

impl<F> LabelSource for F
where
    F: Fn(&Context) -> BTreeMap<String, String> + Send + Sync,
{
    fn labels_for(&self, ctx: &Context) -> BTreeMap<String, String> {
        self(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_background_has_no_labels() {
        assert!(Context::background().labels().is_empty());
    }

    #[test]
    fn test_inner_labels_win() {
        let outer = Context::background()
            .with_labels([("a", "1"), ("b", "1")]);
        let inner = outer.with_labels([("b", "2"), ("c", "2")]);

        let labels = inner.labels();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels["a"], "1");
        assert_eq!(labels["b"], "2");
        assert_eq!(labels["c"], "2");

        let labels = outer.labels();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["b"], "1");
    }

    #[test]
    fn test_label_cap() {
        let ctx = Context::background()
            .with_labels((0..MAX_LABELS).map(|i| Label::new(format!("k{}", i), "v")));
        let ctx = ctx.with_labels([("extra", "x"), ("k0", "override")]);

        let labels = ctx.labels();
        assert_eq!(labels.len(), MAX_LABELS);
        assert!(!labels.contains_key("extra"));
        assert_eq!(labels["k0"], "override");
    }

    #[test]
    fn test_span_hex() {
        let span = SpanContext::from_hex("0af7651916cd43dd8448eb211c80319c", "b7ad6b7169203331", true)
            .unwrap();
        assert_eq!(span.trace_id(), "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(span.span_id(), "b7ad6b7169203331");
        assert!(span.has_trace_id());
        assert!(span.is_sampled());

        assert!(SpanContext::from_hex("zz", "01", false).is_err());
        assert!(!SpanContext::default().has_span_id());
    }

    #[test]
    fn test_baggage_replaces_same_key() {
        let baggage: Baggage = vec![Member::new("a", "1"), Member::new("a", "2")]
            .into_iter()
            .collect();
        assert_eq!(baggage.len(), 1);
        assert_eq!(baggage.member("a").unwrap().value, "2");
    }

    #[test]
    fn test_cancel() {
        let (ctx, handle) = Context::background().with_cancel();
        let child = ctx.with_labels([("k", "v")]);
        assert!(!child.is_cancelled());

        handle.cancel();
        assert!(ctx.is_cancelled());
        assert!(child.is_cancelled());
        assert!(!Context::background().is_cancelled());
    }

    #[test]
    fn test_drop_handle_cancels() {
        let (ctx, handle) = Context::background().with_cancel();
        drop(handle);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_wait_for_value() {
        let (tx, rx) = bounded(1);
        tx.send(7).unwrap();
        assert_eq!(Context::background().wait_for(&rx).unwrap(), 7);
    }

    #[test]
    fn test_wait_for_disconnected() {
        let (tx, rx) = bounded::<i32>(1);
        drop(tx);
        assert!(matches!(
            Context::background().wait_for(&rx),
            Err(HandlerError::SinkStopped)
        ));
    }

    #[test]
    fn test_wait_for_cancelled() {
        let (_tx, rx) = bounded::<i32>(1);
        let (ctx, handle) = Context::background().with_cancel();

        let waiter = thread::spawn(move || ctx.wait_for(&rx));
        thread::sleep(Duration::from_millis(20));
        handle.cancel();

        assert!(matches!(waiter.join().unwrap(), Err(HandlerError::Cancelled)));
    }

    #[test]
    fn test_wait_for_deadline() {
        let (_tx, rx) = bounded::<i32>(1);
        let ctx = Context::background().with_timeout(Duration::from_millis(10));
        assert!(matches!(ctx.wait_for(&rx), Err(HandlerError::DeadlineExceeded)));
    }

    #[test]
    fn test_send_to_queues_value() {
        let (tx, rx) = bounded(1);
        Context::background().send_to(&tx, 7).unwrap();
        assert_eq!(rx.try_recv().unwrap(), 7);
    }

    #[test]
    fn test_send_to_full_channel_cancelled() {
        let (tx, _rx) = bounded(1);
        tx.send(0).unwrap();
        let (ctx, handle) = Context::background().with_cancel();

        let sender = thread::spawn(move || ctx.send_to(&tx, 1));
        thread::sleep(Duration::from_millis(20));
        handle.cancel();

        assert!(matches!(sender.join().unwrap(), Err(HandlerError::Cancelled)));
    }

    #[test]
    fn test_send_to_full_channel_deadline() {
        let (tx, _rx) = bounded(1);
        tx.send(0).unwrap();
        let ctx = Context::background().with_timeout(Duration::from_millis(10));
        assert!(matches!(ctx.send_to(&tx, 1), Err(HandlerError::DeadlineExceeded)));
    }

    #[test]
    fn test_send_to_disconnected() {
        let (tx, rx) = bounded(1);
        drop(rx);
        assert!(matches!(
            Context::background().send_to(&tx, 1),
            Err(HandlerError::SinkStopped)
        ));
    }

    #[test]
    fn test_deadline_keeps_earliest() {
        let now = Instant::now();
        let ctx = Context::background()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_closure_label_source() {
        let source = |_: &Context| BTreeMap::from([("fixed".to_string(), "yes".to_string())]);
        assert_eq!(source.labels_for(&Context::background())["fixed"], "yes");
        assert!(ContextLabels.labels_for(&Context::background()).is_empty());
    }
}
