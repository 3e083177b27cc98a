use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cue that went on screen; timestamps are nanoseconds since the clock origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueEvent {
    pub epoch: usize,
    pub shown_at_ns: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub epoch: usize,
    pub reaction_time: Duration,
}

/// An acknowledge press with no cue on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub epoch: usize,
    pub at_ns: u64,
}

/// Entry of the run-wide chronological event log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventLogEntry {
    CueShown {
        epoch: usize,
        at_ns: u64,
    },
    ErrorOccurred {
        epoch: usize,
        at_ns: u64,
    },
    /// Only recorded when resolution logging is enabled
    CueResolved {
        epoch: usize,
        at_ns: u64,
        reaction_time: Duration,
    },
}

impl EventLogEntry {
    /// Label written to the `Event Type` column
    pub fn label(&self) -> &'static str {
        match self {
            EventLogEntry::CueShown { .. } => "green_screen",
            EventLogEntry::ErrorOccurred { .. } => "error",
            EventLogEntry::CueResolved { .. } => "response",
        }
    }

    pub fn epoch(&self) -> usize {
        match *self {
            EventLogEntry::CueShown { epoch, .. }
            | EventLogEntry::ErrorOccurred { epoch, .. }
            | EventLogEntry::CueResolved { epoch, .. } => epoch,
        }
    }

    pub fn at_ns(&self) -> u64 {
        match *self {
            EventLogEntry::CueShown { at_ns, .. }
            | EventLogEntry::ErrorOccurred { at_ns, .. }
            | EventLogEntry::CueResolved { at_ns, .. } => at_ns,
        }
    }
}

impl From<CueEvent> for EventLogEntry {
    fn from(cue: CueEvent) -> Self {
        EventLogEntry::CueShown {
            epoch: cue.epoch,
            at_ns: cue.shown_at_ns,
        }
    }
}

impl From<ErrorEvent> for EventLogEntry {
    fn from(err: ErrorEvent) -> Self {
        EventLogEntry::ErrorOccurred {
            epoch: err.epoch,
            at_ns: err.at_ns,
        }
    }
}

/// Append-only log kept in insertion order across all epochs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    entries: Vec<EventLogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<EventLogEntry>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[EventLogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EventLogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_epoch(&self, epoch: usize) -> impl Iterator<Item = &EventLogEntry> {
        self.entries.iter().filter(move |e| e.epoch() == epoch)
    }

    pub fn count_errors(&self, epoch: usize) -> usize {
        self.for_epoch(epoch)
            .filter(|e| matches!(e, EventLogEntry::ErrorOccurred { .. }))
            .count()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a EventLogEntry;
    type IntoIter = std::slice::Iter<'a, EventLogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
