//! Append-only, capped event log shared by every subsystem.
//!
//! The chronicle is the narrative surface of the engine: each subsystem
//! appends a short headline with a one-line cause and consequence, and the
//! presentation layer reads it back in order. When the cap is reached the
//! oldest entries are trimmed.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::enums::ChronicleKind;
use crate::structs::ChronicleEntry;

/// Default number of retained entries.
pub const DEFAULT_CHRONICLE_CAPACITY: usize = 200;

/// Capped chronicle of notable events, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chronicle {
    /// Retained entries.
    entries: VecDeque<ChronicleEntry>,
    /// Maximum retained entries (at least 1).
    capacity: usize,
    /// Entries ever appended, including trimmed ones.
    total_recorded: u64,
}

impl Chronicle {
    /// Create an empty chronicle retaining at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            total_recorded: 0,
        }
    }

    /// Append an entry, trimming the oldest when over capacity.
    pub fn push(&mut self, entry: ChronicleEntry) {
        self.entries.push_back(entry);
        self.total_recorded = self.total_recorded.saturating_add(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Build and append an entry; the icon is derived from `kind`.
    pub fn record(
        &mut self,
        at: f64,
        kind: ChronicleKind,
        message: impl Into<String>,
        cause: impl Into<String>,
        consequence: impl Into<String>,
    ) {
        self.push(ChronicleEntry {
            at,
            kind,
            icon: kind.icon().to_owned(),
            message: message.into(),
            cause: cause.into(),
            consequence: consequence.into(),
        });
    }

    /// Change the cap, trimming immediately if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Maximum retained entries.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ever appended, including trimmed ones.
    pub const fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    /// Iterate retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ChronicleEntry> {
        self.entries.iter()
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&ChronicleEntry> {
        self.entries.back()
    }

    /// Number of retained entries of `kind`.
    pub fn count_kind(&self, kind: ChronicleKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Clone the retained entries into a `Vec`, oldest first.
    pub fn to_vec(&self) -> Vec<ChronicleEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Drop every retained entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for Chronicle {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHRONICLE_CAPACITY)
    }
}
