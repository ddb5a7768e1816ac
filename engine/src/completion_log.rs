//! Day-partitioned, append-only store of accepted completions.
//!
//! One JSON-array file per calendar day (local date) under the data
//! directory, named `{key_prefix}{YYYY-MM-DD}.json`. The store keeps an
//! in-memory mirror of today's partition for export and display; the durable
//! files are only ever appended to through the read-merge-write [`append`]
//! and removed whole by [`clear`] — callers never touch partition files
//! directly.
//!
//! [`append`]: CompletionLog::append
//! [`clear`]: CompletionLog::clear

use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::Local;
use chrono::NaiveDate;
use fimpad_protocol::LogEntry;
use fimpad_protocol::errors::LogError;

use crate::atomic_write::write_atomic_json;

/// Serialized export blob plus its download file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlob {
    pub file_name: String,
    pub jsonl: String,
}

#[derive(Debug)]
pub struct CompletionLog {
    data_dir: PathBuf,
    key_prefix: String,
    file_prefix: String,
    /// Mirror of today's partition, in append order.
    mirror: Vec<LogEntry>,
}

impl CompletionLog {
    /// Open the store and load today's partition into the mirror.
    pub fn open(
        data_dir: PathBuf,
        key_prefix: impl Into<String>,
        file_prefix: impl Into<String>,
    ) -> Self {
        let mut log = Self {
            data_dir,
            key_prefix: key_prefix.into(),
            file_prefix: file_prefix.into(),
            mirror: Vec::new(),
        };
        log.mirror = log.load(today());
        log
    }

    /// Partition key for a date, e.g. `fim_completions_2026-08-30`.
    pub fn partition_key(&self, date: NaiveDate) -> String {
        format!("{}{}", self.key_prefix, date.format("%Y-%m-%d"))
    }

    fn partition_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.partition_key(date)))
    }

    pub fn mirror(&self) -> &[LogEntry] {
        &self.mirror
    }

    /// Load one day's entries. Missing partitions are empty; corrupt or
    /// unreadable partitions degrade to empty with a warning — loading never
    /// fails.
    pub fn load(&self, date: NaiveDate) -> Vec<LogEntry> {
        let path = self.partition_path(date);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    %err,
                    "unreadable completion partition, treating as empty"
                );
                return Vec::new();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    %err,
                    "corrupt completion partition, treating as empty"
                );
                Vec::new()
            }
        }
    }

    /// Append an entry to today's partition.
    ///
    /// Read-merge-write: the partition is re-read from disk, the entry
    /// appended, and the whole partition written back atomically — all
    /// synchronously, so repeated appends never lose prior entries. The
    /// mirror is updated in the same call.
    pub fn append(&mut self, entry: LogEntry) -> Result<(), LogError> {
        let date = today();
        let key = self.partition_key(date);
        let mut entries = self.load(date);
        entries.push(entry);

        write_atomic_json(&self.partition_path(date), &entries).map_err(|err| {
            LogError::WriteFailed {
                key: key.clone(),
                attempted: entries.len(),
                message: format!("{err:#}"),
            }
        })?;
        tracing::debug!(key, total = entries.len(), "appended completion entry");
        self.mirror = entries;
        Ok(())
    }

    /// Serialize the mirror as newline-delimited JSON, one entry per line in
    /// append order, with a trailing newline. `None` when the mirror is
    /// empty (the caller shows a notice instead of producing an empty file).
    pub fn export_all(&self) -> anyhow::Result<Option<ExportBlob>> {
        if self.mirror.is_empty() {
            return Ok(None);
        }
        let mut jsonl = String::new();
        for entry in &self.mirror {
            jsonl.push_str(&serde_json::to_string(entry)?);
            jsonl.push('\n');
        }
        Ok(Some(ExportBlob {
            file_name: format!("{}{}.jsonl", self.file_prefix, today().format("%Y-%m-%d")),
            jsonl,
        }))
    }

    /// Remove the persisted partition for `date` and, when it is today's,
    /// empty the mirror. Removal is a single unlink: the partition is either
    /// gone or untouched, never half-cleared.
    pub fn clear(&mut self, date: NaiveDate) -> Result<(), LogError> {
        let path = self.partition_path(date);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(LogError::ClearFailed {
                    key: self.partition_key(date),
                    message: err.to_string(),
                });
            }
        }
        if date == today() {
            self.mirror.clear();
        }
        Ok(())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn entry(content: &str) -> LogEntry {
        LogEntry {
            content: content.to_string(),
            timestamp: Utc::now(),
            model: "StarCoder2 7B".to_string(),
        }
    }

    fn open(dir: &Path) -> CompletionLog {
        CompletionLog::open(dir.to_path_buf(), "fim_completions_", "fim_completions_")
    }

    #[test]
    fn append_then_load_round_trips_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut log = open(dir.path());

        for i in 0..4 {
            log.append(entry(&format!("entry {i}"))).expect("append");
        }

        let loaded = log.load(today());
        assert_eq!(loaded.len(), 4);
        let contents: Vec<_> = loaded.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["entry 0", "entry 1", "entry 2", "entry 3"]);
        assert_eq!(log.mirror(), loaded.as_slice());

        log.clear(today()).expect("clear");
        assert!(log.load(today()).is_empty());
        assert!(log.mirror().is_empty());
    }

    #[test]
    fn reopening_picks_up_the_existing_partition() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut log = open(dir.path());
        log.append(entry("persisted")).expect("append");

        let reopened = open(dir.path());
        assert_eq!(reopened.mirror().len(), 1);
        assert_eq!(reopened.mirror()[0].content, "persisted");
    }

    #[test]
    fn missing_partition_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = open(dir.path());
        let date = "2020-01-01".parse().expect("date");
        assert!(log.load(date).is_empty());
    }

    #[test]
    fn corrupt_partition_degrades_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut log = open(dir.path());
        log.append(entry("good")).expect("append");

        let path = log.partition_path(today());
        std::fs::write(&path, "{not json").expect("corrupt");

        assert!(log.load(today()).is_empty());
        // Appending after corruption starts the partition over rather than
        // failing.
        log.append(entry("after")).expect("append");
        assert_eq!(log.load(today()).len(), 1);
    }

    #[test]
    fn export_is_ndjson_in_append_order_with_trailing_newline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut log = open(dir.path());
        log.append(entry("first")).expect("append");
        log.append(entry("second")).expect("append");

        let blob = log.export_all().expect("export").expect("non-empty");
        assert_eq!(
            blob.file_name,
            format!("fim_completions_{}.jsonl", today().format("%Y-%m-%d"))
        );
        assert!(blob.jsonl.ends_with('\n'));

        let lines: Vec<LogEntry> = blob
            .jsonl
            .lines()
            .map(|line| serde_json::from_str(line).expect("parse line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].content, "first");
        assert_eq!(lines[1].content, "second");
    }

    #[test]
    fn empty_mirror_exports_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = open(dir.path());
        assert_eq!(log.export_all().expect("export"), None);
    }

    #[test]
    fn clearing_a_missing_partition_is_fine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut log = open(dir.path());
        let date = "2020-01-01".parse().expect("date");
        log.clear(date).expect("clear");
    }
}
