//! In-memory sink

use crate::core::{Context, Entry, Result, Sink};
use parking_lot::Mutex;

/// Keeps every entry in memory, buffered and synchronous ones apart
///
/// Meant for tests and tooling that inspect what a handler produced.
#[derive(Debug, Default)]
pub struct MemorySink {
    buffered: Mutex<Vec<Entry>>,
    synced: Mutex<Vec<Entry>>,
    flushes: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries received through [`Sink::log`]
    pub fn entries(&self) -> Vec<Entry> {
        self.buffered.lock().clone()
    }

    /// Entries received through [`Sink::log_sync`]
    pub fn sync_entries(&self) -> Vec<Entry> {
        self.synced.lock().clone()
    }

    /// Entries of both paths, buffered first
    pub fn all_entries(&self) -> Vec<Entry> {
        let mut all = self.entries();
        all.extend(self.sync_entries());
        all
    }

    pub fn flush_count(&self) -> usize {
        *self.flushes.lock()
    }

    pub fn clear(&self) {
        self.buffered.lock().clear();
        self.synced.lock().clear();
    }
}

impl Sink for MemorySink {
    fn log(&self, entry: Entry) {
        self.buffered.lock().push(entry);
    }

    fn log_sync(&self, _ctx: &Context, entry: Entry) -> Result<()> {
        self.synced.lock().push(entry);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        *self.flushes.lock() += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
