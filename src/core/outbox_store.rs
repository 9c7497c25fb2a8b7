//! Append-only outbox store with file-based persistence.
//!
//! Follows the event log pattern: inserts and deletes are appended as JSON lines
//! and the set of pending events is derived by replaying the log. Every access
//! holds an exclusive lock on a sibling `.lock` file, so concurrent writers (in this
//! process or another) never hand out the same ID.
//!
//! Once delete markers outnumber pending events the log is rewritten with only the
//! pending events and a watermark of the highest ID assigned, so delivered payloads
//! leave the disk and replay cost tracks the pending set.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::{OutboxEvent, OutboxEventData};

/// Durable storage for translated events awaiting publication
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Persist an event, assigning its ID and creation time
    async fn insert(&self, data: OutboxEventData) -> Result<OutboxEvent>;

    /// Pending events in ID order
    async fn list(&self, limit: usize) -> Result<Vec<OutboxEvent>>;

    async fn get(&self, id: i64) -> Result<Option<OutboxEvent>>;

    /// Remove a delivered event. Returns false if it was not pending.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// A line in the outbox log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogEntry {
    Inserted { event: OutboxEvent },
    Deleted { id: i64, at: DateTime<Utc> },

    /// Highest ID assigned before the log was compacted
    Watermark { last_id: i64 },
}

/// State derived from replaying the log
#[derive(Debug, Default)]
struct OutboxState {
    pending: BTreeMap<i64, OutboxEvent>,

    /// Highest ID ever assigned, including deleted events
    last_id: i64,

    /// Delete markers since the last compaction
    tombstones: usize,
}

impl OutboxState {
    fn apply(&mut self, entry: LogEntry) {
        match entry {
            LogEntry::Inserted { event } => {
                self.last_id = self.last_id.max(event.id);
                self.pending.insert(event.id, event);
            }
            LogEntry::Deleted { id, .. } => {
                self.pending.remove(&id);
                self.tombstones += 1;
            }
            LogEntry::Watermark { last_id } => {
                self.last_id = self.last_id.max(last_id);
            }
        }
    }
}

/// The log file, opened while the outbox lock is held
struct LockedLog {
    path: PathBuf,
    file: File,
}

/// JSONL-backed outbox
pub struct JsonlOutbox {
    log_path: PathBuf,
}

impl JsonlOutbox {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Default log location ($OUTBOX_HOME/outbox.jsonl)
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::config::outbox_home()?.join("outbox.jsonl"))
    }

    /// Open the outbox in the default location
    pub async fn open_default() -> Result<Self> {
        let path = Self::default_path()?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create outbox directory: {}", parent.display()))?;
        }

        Ok(Self::new(path))
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Run `f` against the log on the blocking pool, holding the outbox lock.
    ///
    /// The lock lives on its own file because compaction replaces the log file.
    async fn with_log<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut LockedLog) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let path = self.log_path.clone();

        tokio::task::spawn_blocking(move || {
            let lock_path = sibling(&path, ".lock");
            let lock = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&lock_path)
                .with_context(|| format!("Failed to open outbox lock: {}", lock_path.display()))?;

            lock.lock_exclusive()
                .with_context(|| format!("Failed to lock outbox: {}", lock_path.display()))?;

            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open outbox log: {}", path.display()))?;

            // Lock is released when `lock` is dropped
            f(&mut LockedLog { path, file })
        })
        .await
        .context("Outbox task failed")?
    }
}

/// `path` with `suffix` appended to its file name
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Rebuild state from the log.
///
/// An unterminated last line is what a crash mid-append leaves behind: if it does
/// not parse it is cut off, if it does its newline is restored. A bad line anywhere
/// else is an error.
fn replay(log: &mut LockedLog) -> Result<OutboxState> {
    let mut content = Vec::new();
    log.file
        .read_to_end(&mut content)
        .context("Failed to read outbox log")?;

    let mut state = OutboxState::default();
    let mut offset = 0;

    while offset < content.len() {
        let (line, terminated) = match content[offset..].iter().position(|b| *b == b'\n') {
            Some(end) => (&content[offset..offset + end], true),
            None => (&content[offset..], false),
        };
        let next = offset + line.len() + usize::from(terminated);

        if line.iter().all(u8::is_ascii_whitespace) {
            offset = next;
            continue;
        }

        match serde_json::from_slice::<LogEntry>(line) {
            Ok(entry) => {
                state.apply(entry);
                if !terminated {
                    log.file
                        .write_all(b"\n")
                        .context("Failed to terminate outbox entry")?;
                }
            }
            Err(err) if !terminated => {
                warn!(
                    path = %log.path.display(),
                    offset,
                    bytes = line.len(),
                    error = %err,
                    "Truncating incomplete outbox entry"
                );
                log.file
                    .set_len(offset as u64)
                    .context("Failed to truncate outbox log")?;
                log.file.sync_all().context("Failed to sync outbox log")?;
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "Failed to parse outbox entry: {}",
                        String::from_utf8_lossy(line)
                    )
                });
            }
        }

        offset = next;
    }

    Ok(state)
}

fn append(file: &mut File, entry: &LogEntry) -> Result<()> {
    let json = serde_json::to_string(entry).context("Failed to serialize outbox entry")?;
    writeln!(file, "{}", json).context("Failed to write outbox entry")?;
    file.flush().context("Failed to flush outbox entry")?;
    Ok(())
}

/// Replace the log with the watermark and the pending events
fn compact(log: &LockedLog, state: &OutboxState) -> Result<()> {
    let tmp_path = sibling(&log.path, ".compact");

    let mut tmp = File::create(&tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
    append(
        &mut tmp,
        &LogEntry::Watermark {
            last_id: state.last_id,
        },
    )?;
    for event in state.pending.values() {
        append(
            &mut tmp,
            &LogEntry::Inserted {
                event: event.clone(),
            },
        )?;
    }
    tmp.sync_all().context("Failed to sync compacted outbox log")?;

    std::fs::rename(&tmp_path, &log.path)
        .with_context(|| format!("Failed to replace outbox log: {}", log.path.display()))?;
    Ok(())
}

#[async_trait]
impl OutboxStore for JsonlOutbox {
    #[instrument(skip(self, data), fields(workflow = %data.workflow_name))]
    async fn insert(&self, data: OutboxEventData) -> Result<OutboxEvent> {
        let event = self
            .with_log(move |log| {
                let state = replay(log)?;
                let event = OutboxEvent::from_data(state.last_id + 1, data, Utc::now());
                append(
                    &mut log.file,
                    &LogEntry::Inserted {
                        event: event.clone(),
                    },
                )?;
                Ok(event)
            })
            .await?;

        info!(id = event.id, bytes = event.data.len(), "Outbox event stored");
        Ok(event)
    }

    #[instrument(skip(self))]
    async fn list(&self, limit: usize) -> Result<Vec<OutboxEvent>> {
        self.with_log(move |log| {
            let state = replay(log)?;
            Ok(state.pending.into_values().take(limit).collect())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn get(&self, id: i64) -> Result<Option<OutboxEvent>> {
        self.with_log(move |log| {
            let mut state = replay(log)?;
            Ok(state.pending.remove(&id))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool> {
        self.with_log(move |log| {
            let mut state = replay(log)?;
            if state.pending.remove(&id).is_none() {
                return Ok(false);
            }
            state.tombstones += 1;

            if state.tombstones >= state.pending.len() {
                compact(log, &state)?;
                debug!(pending = state.pending.len(), "Outbox log compacted");
            } else {
                append(&mut log.file, &LogEntry::Deleted { id, at: Utc::now() })?;
            }
            Ok(true)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (JsonlOutbox, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlOutbox::new(temp_dir.path().join("outbox.jsonl"));
        (store, temp_dir)
    }

    fn data(workflow: &str) -> OutboxEventData {
        OutboxEventData {
            workflow_name: workflow.to_string(),
            data: vec![0x0a, 0x01, b'x'],
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let (store, _temp) = create_test_store();

        let first = store.insert(data("a")).await.unwrap();
        let second = store.insert(data("b")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.workflow_name, "b");
        assert!(second.created_at >= first.created_at);
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let (store, _temp) = create_test_store();
        assert!(store.list(10).await.unwrap().is_empty());
        assert!(store.get(1).await.unwrap().is_none());
    }

    fn log_lines(store: &JsonlOutbox) -> Vec<String> {
        std::fs::read_to_string(store.log_path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn append_raw(store: &JsonlOutbox, raw: &[u8]) {
        let mut file = OpenOptions::new().append(true).open(store.log_path()).unwrap();
        file.write_all(raw).unwrap();
    }

    #[tokio::test]
    async fn test_log_format() {
        let (store, _temp) = create_test_store();
        for workflow in ["a", "b", "c"] {
            store.insert(data(workflow)).await.unwrap();
        }
        store.delete(1).await.unwrap();

        let lines = log_lines(&store);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("\"op\":\"inserted\""));
        assert!(lines[0].contains("\"data\":\"0a0178\""));
        assert!(lines[3].contains("\"op\":\"deleted\""));
    }

    #[tokio::test]
    async fn test_delete_compacts_log() {
        let (store, _temp) = create_test_store();

        store.insert(data("a")).await.unwrap();
        let single_insert_bytes = std::fs::metadata(store.log_path()).unwrap().len();
        store.delete(1).await.unwrap();

        for _ in 0..99 {
            let event = store.insert(data("a")).await.unwrap();
            assert!(store.delete(event.id).await.unwrap());
        }

        let lines = log_lines(&store);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"op\":\"watermark\""));
        assert!(lines[0].contains("\"last_id\":100"));
        assert!(std::fs::metadata(store.log_path()).unwrap().len() < single_insert_bytes);

        assert_eq!(store.insert(data("a")).await.unwrap().id, 101);
    }

    #[tokio::test]
    async fn test_compaction_keeps_pending_events() {
        let (store, _temp) = create_test_store();
        for workflow in ["a", "b", "c"] {
            store.insert(data(workflow)).await.unwrap();
        }

        store.delete(1).await.unwrap();
        store.delete(3).await.unwrap();

        let lines = log_lines(&store);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"last_id\":3"));

        let pending = store.list(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, 2);
        assert_eq!(pending[0].workflow_name, "b");

        assert_eq!(store.insert(data("d")).await.unwrap().id, 4);
    }

    #[tokio::test]
    async fn test_partial_trailing_entry_is_truncated() {
        let (store, _temp) = create_test_store();
        store.insert(data("a")).await.unwrap();
        append_raw(&store, br#"{"op":"inser"#);

        let next = store.insert(data("b")).await.unwrap();
        assert_eq!(next.id, 2);

        let lines = log_lines(&store);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.ends_with('}')));
        assert_eq!(store.list(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unterminated_complete_entry_is_kept() {
        let (store, _temp) = create_test_store();
        store.insert(data("a")).await.unwrap();

        let len = std::fs::metadata(store.log_path()).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(store.log_path())
            .unwrap()
            .set_len(len - 1)
            .unwrap();

        assert_eq!(store.insert(data("b")).await.unwrap().id, 2);
        assert_eq!(log_lines(&store).len(), 2);
        assert_eq!(store.list(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_entry_mid_log_is_an_error() {
        let (store, _temp) = create_test_store();
        store.insert(data("a")).await.unwrap();
        append_raw(&store, b"not json\n");
        store.insert(data("b")).await.unwrap_err();

        assert!(store.list(10).await.is_err());
    }
}
