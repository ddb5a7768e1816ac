//! Ops and events exchanged between a host editor and the session
//! coordinator.
//!
//! Uses a submission/event split: the editor submits [`EditorOp`]s and
//! consumes [`SessionEvent`]s. The editor widget itself stays opaque — it is
//! only expected to report keystrokes and buffer mutations, and to apply
//! suggestion lists and highlight spans handed back to it.

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

/// Input from the host editor or its surrounding UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorOp {
    /// The trigger chord fired. Both the primary and the alternate chord map
    /// here; `full_text` and `cursor_offset` are captured synchronously at
    /// the instant the chord fired, so later typing cannot drift the framed
    /// prompt.
    TriggerCompletion {
        full_text: String,
        cursor_offset: usize,
    },

    /// The editor buffer changed. While an offer is live this is tested
    /// against the pending candidate set for acceptance.
    BufferMutated {
        inserted_text: String,
        insert_offset: usize,
    },

    /// Escape key: dismiss any active completion highlight.
    Escape,

    /// Persist the accepted completion held by trace entry `index` to the
    /// durable log.
    SaveEntry { index: usize },

    /// Mark the accepted completion held by trace entry `index` as rejected.
    /// Distinct from dwell expiry: rejection is recorded, expiry is silent.
    RejectEntry { index: usize },

    /// Replace the accepted text of trace entry `index`. Only allowed while
    /// the entry is neither saved nor rejected.
    EditEntry { index: usize, content: String },

    /// Export all of today's mirrored entries as one JSONL blob.
    ExportAll,

    /// Remove the persisted partition for `date`. Confirmation is the
    /// caller's responsibility; the operation itself is atomic.
    ClearDay { date: NaiveDate },
}

/// Output the host editor (or surrounding UI) must apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionEvent {
    /// Candidates are ready: open the suggestion UI immediately. The
    /// generation lets the editor drop a stale open that raced with a newer
    /// trigger.
    SuggestionsReady {
        generation: u64,
        items: Vec<SuggestionItem>,
    },

    /// A candidate was detected as inserted into the buffer.
    CompletionAccepted {
        accepted_text: String,
        original_prompt: String,
        final_fim_text: String,
    },

    /// Apply a transient visual marker over the inserted span.
    HighlightSpan {
        offset: usize,
        len: usize,
        clear_after_secs: u64,
    },

    /// Remove the completion highlight (timer elapsed or escape pressed).
    ClearHighlight,

    /// User-visible notice (persistence results, export problems, ...).
    Notice { text: String },

    /// Serialized export blob ready for download.
    ExportReady { file_name: String, jsonl: String },

    /// The session trace ring changed; trace views should refresh.
    TraceUpdated,
}

/// One entry of the editor's suggestion list, in rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionItem {
    /// Human-readable label: rank plus a first-line preview.
    pub label: String,
    /// Secondary label, e.g. the candidate's line count.
    pub detail: String,
    /// Full candidate text to insert on acceptance.
    pub insert_text: String,
    /// Zero-padded rank key so the editor preserves backend order.
    pub sort_text: String,
    /// Index 0 is pre-selected in the suggestion UI.
    pub preselect: bool,
}
