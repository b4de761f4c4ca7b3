//! Sink implementations

pub mod buffered;
pub mod json_writer;
pub mod memory;

pub use buffered::{BufferedSink, BufferedSinkBuilder, OverflowCallback, DEFAULT_SHUTDOWN_TIMEOUT};
pub use json_writer::JsonWriterSink;
pub use memory::MemorySink;

pub use crate::core::{Discard, FnSink, Sink};
