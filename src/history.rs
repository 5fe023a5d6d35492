use crate::location::{Location, LogEntry};
use chrono::Utc;
use crossbeam::channel::{self, Receiver, Sender};

/// Change notification sent to history watchers
#[derive(Debug, Clone, PartialEq)]
pub enum LogChange {
    Appended { index: usize, entry: LogEntry },
}

/// Append-only location log in arrival order
#[derive(Debug, Default)]
pub struct LocationHistory {
    entries: Vec<LogEntry>,
    watchers: Vec<Sender<LogChange>>,
}

impl LocationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format and append a fix, then notify watchers
    pub fn push(&mut self, location: &Location) -> LogEntry {
        let entry = LogEntry::from_location(location, Utc::now());
        let index = self.entries.len();
        self.entries.push(entry.clone());

        // Drop watchers whose receiver is gone
        self.watchers.retain(|watcher| {
            watcher
                .send(LogChange::Appended {
                    index,
                    entry: entry.clone(),
                })
                .is_ok()
        });

        entry
    }

    /// Subscribe to appends made after this call
    pub fn watch(&mut self) -> Receiver<LogChange> {
        let (tx, rx) = channel::unbounded();
        self.watchers.push(tx);
        rx
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
