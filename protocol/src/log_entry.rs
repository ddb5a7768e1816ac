use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// One durable completion-log record.
///
/// `content` is the final FIM text (prompt with the middle span filled by the
/// accepted completion). Entries are appended to a day partition in creation
/// order and never rewritten once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub content: String,
    /// RFC3339 timestamp of when the entry was accepted.
    pub timestamp: DateTime<Utc>,
    /// Human-readable label of the model that produced the completion.
    pub model: String,
}
