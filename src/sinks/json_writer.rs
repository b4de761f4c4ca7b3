//! JSON sink for structured logging
//!
//! Writes each entry as a single-line JSON object in the structured-logging
//! layout that the Cloud Logging agents pick up from stdout, stderr or a
//! file.

use crate::core::{Context, Entry, HandlerError, Result, Sink};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub struct JsonWriterSink<W: Write + Send> {
    writer: Mutex<W>,
    name: String,
}

impl JsonWriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::with_name(io::stdout(), "stdout")
    }
}

impl JsonWriterSink<io::Stderr> {
    pub fn stderr() -> Self {
        Self::with_name(io::stderr(), "stderr")
    }
}

impl JsonWriterSink<BufWriter<File>> {
    /// Append to the file at `path`, creating it if needed
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::with_name(BufWriter::new(file), "json-file"))
    }
}

impl<W: Write + Send> JsonWriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_name(writer, "json")
    }

    fn with_name(writer: W, name: &str) -> Self {
        Self {
            writer: Mutex::new(writer),
            name: name.to_string(),
        }
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_entry(&self, entry: &Entry) -> Result<()> {
        let json = entry.to_json()?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", json)?;
        Ok(())
    }
}

impl<W: Write + Send> Sink for JsonWriterSink<W> {
    fn log(&self, entry: Entry) {
        if let Err(e) = self.write_entry(&entry) {
            eprintln!("[LOGGER ERROR] Sink '{}' failed to write entry: {}", self.name, e);
        }
    }

    /// Write and flush the entry
    fn log_sync(&self, ctx: &Context, entry: Entry) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(HandlerError::Cancelled);
        }
        self.write_entry(&entry)?;
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
