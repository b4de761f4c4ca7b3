//! Entry augmentors
//!
//! Each augmentor runs after the entry is built and may add labels, trace
//! fields or payload fields. They are enabled through
//! [`HandlerBuilder`](crate::HandlerBuilder).

#[cfg(feature = "k8s")]
pub mod k8s;
#[cfg(feature = "otel")]
pub mod otel;

#[cfg(feature = "k8s")]
pub use k8s::{PodinfoLabels, DEFAULT_PODINFO_ROOT, POD_LABEL_PREFIX};
#[cfg(feature = "otel")]
pub use otel::{BaggageAugmentor, TraceAugmentor, BAGGAGE_KEY_PREFIX};
