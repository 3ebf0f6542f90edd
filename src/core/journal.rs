use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use log::debug;

/// Receives human-readable diagnostics from the engine.
///
/// A sink must never fail the caller: an entry that cannot be stored is
/// dropped.
pub trait LogSink: Debug + Send + Sync {
    fn append(&self, entry: &str);
}

/** Append-only in-memory log. Clones share the same buffer, so a caller can
 * hand one clone to a game and keep another to read entries back. */
#[derive(Debug, Clone, Default)]
pub struct ModelLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ModelLog {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl LogSink for ModelLog {
    fn append(&self, entry: &str) {
        debug!("{entry}");
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.to_owned());
        }
    }
}

/** Discards everything. Used for bulk simulation such as perft. */
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLog;

impl LogSink for NullLog {
    fn append(&self, _entry: &str) {}
}

pub(crate) fn default_sink() -> Arc<dyn LogSink> {
    Arc::new(ModelLog::new())
}
