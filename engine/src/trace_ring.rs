//! Bounded, most-recent-first ring of session trace records.
//!
//! Session-only observability: entries are never persisted across restarts.
//! Acceptance entries can be edited, saved, or rejected through the ring
//! until they are resolved.

use std::collections::VecDeque;

use chrono::Local;
use fimpad_protocol::DebugEntry;
use fimpad_protocol::fim;

/// Result of attempting to edit a trace entry's accepted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The entry was updated and its saved/rejected state reset.
    Applied,
    /// The entry was already saved or rejected (or is not an acceptance);
    /// the durable record stays append-only, so the edit is refused.
    Refused,
    NoSuchEntry,
}

#[derive(Debug)]
pub struct TraceRing {
    cap: usize,
    /// Front is the most recent entry.
    entries: VecDeque<DebugEntry>,
}

impl TraceRing {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Record a new entry at the front, dropping the oldest beyond the cap.
    pub fn record(&mut self, entry: DebugEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.cap);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DebugEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DebugEntry> {
        self.entries.iter()
    }

    /// Mark the acceptance at `index` as saved. Returns `false` for indexes
    /// that do not hold a pending acceptance.
    pub fn mark_saved(&mut self, index: usize) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) if entry.is_pending_acceptance() => {
                entry.mark_saved(Local::now());
                true
            }
            _ => false,
        }
    }

    /// Mark the acceptance at `index` as rejected. Rejection is recorded
    /// with a timestamp, unlike silent dwell expiry.
    pub fn mark_rejected(&mut self, index: usize) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) if entry.is_pending_acceptance() => {
                entry.mark_rejected(Local::now());
                true
            }
            _ => false,
        }
    }

    /// Replace the accepted text of the entry at `index`, re-splicing its
    /// final FIM text from the recorded prompt and resetting saved/rejected
    /// state. Only pending acceptances may be edited.
    pub fn edit_entry(&mut self, index: usize, content: &str) -> EditOutcome {
        let Some(entry) = self.entries.get_mut(index) else {
            return EditOutcome::NoSuchEntry;
        };
        if !entry.is_pending_acceptance() {
            return EditOutcome::Refused;
        }
        entry.accepted_text = Some(content.to_string());
        entry.final_fim_text = Some(fim::splice(&entry.prompt, content));
        entry.reset_resolution();
        EditOutcome::Applied
    }
}
