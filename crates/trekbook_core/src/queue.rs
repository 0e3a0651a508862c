//! Local durable queue of pending memories.
//!
//! The queue is a single named slot holding the whole ordered list of
//! [`PendingEntry`] records as JSON. Every mutation is a read-modify-write of the
//! slot. Within one process those cycles are serialized by an async mutex, so an
//! enqueue racing a drain's final removal is never lost. Across a crash the
//! window between read and write is accepted; the write itself goes through a
//! temporary file and a rename so the slot is never half-written.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entry::{EntryDraft, PendingEntry};
use crate::error::{Result, TrekError};
use crate::fs::AsyncFileSystem;

/// Result of [`PendingQueue::push`].
#[derive(Debug, Clone)]
pub struct Enqueued {
    /// The stored record.
    pub record: PendingEntry,
    /// Records waiting after the push, this one included.
    pub pending: usize,
}

/// Persistent, append-ordered store of drafts awaiting upload.
pub struct PendingQueue {
    fs: Arc<dyn AsyncFileSystem>,
    path: PathBuf,
    slot_lock: Mutex<()>,
}

impl PendingQueue {
    /// Open the queue slot at `path`. Nothing is read until the first access.
    pub fn new(fs: Arc<dyn AsyncFileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
            slot_lock: Mutex::new(()),
        }
    }

    /// Location of the slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every pending record in enqueue order.
    pub async fn load(&self) -> Result<Vec<PendingEntry>> {
        let _guard = self.slot_lock.lock().await;
        self.read_slot().await
    }

    /// Number of pending records.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.load().await?.len())
    }

    /// Whether nothing is waiting.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.load().await?.is_empty())
    }

    /// Append a draft verbatim and return the stored record.
    pub async fn push(&self, draft: EntryDraft) -> Result<Enqueued> {
        let _guard = self.slot_lock.lock().await;
        let mut records = self.read_slot().await?;
        let record = PendingEntry::new(draft);
        records.push(record.clone());
        self.write_slot(&records).await?;
        log::debug!(
            "queued memory {} ({} pending)",
            record.queue_id,
            records.len()
        );
        Ok(Enqueued {
            record,
            pending: records.len(),
        })
    }

    /// Remove exactly the records with the given queue ids.
    ///
    /// Records enqueued after `ids` was captured are kept. Returns how many
    /// records were removed.
    pub async fn remove(&self, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let _guard = self.slot_lock.lock().await;
        let mut records = self.read_slot().await?;
        let before = records.len();
        records.retain(|r| !ids.contains(&r.queue_id));
        let removed = before - records.len();
        if removed > 0 {
            self.write_slot(&records).await?;
        }
        Ok(removed)
    }

    /// Drop every pending record.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.slot_lock.lock().await;
        self.write_slot(&[]).await
    }

    async fn read_slot(&self) -> Result<Vec<PendingEntry>> {
        if !self.fs.exists(&self.path).await {
            return Ok(Vec::new());
        }
        let contents = self
            .fs
            .read_to_string(&self.path)
            .await
            .map_err(|e| TrekError::local_persistence(&self.path, e))?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|e| TrekError::local_persistence(&self.path, e))
    }

    async fn write_slot(&self, records: &[PendingEntry]) -> Result<()> {
        let contents = serde_json::to_string(records)
            .map_err(|e| TrekError::local_persistence(&self.path, e))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            self.fs
                .create_dir_all(parent)
                .await
                .map_err(|e| TrekError::local_persistence(&self.path, e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        self.fs
            .write_file(&tmp, &contents)
            .await
            .map_err(|e| TrekError::local_persistence(&self.path, e))?;
        self.fs
            .replace_file(&tmp, &self.path)
            .await
            .map_err(|e| TrekError::local_persistence(&self.path, e))
    }
}

impl std::fmt::Debug for PendingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingQueue")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Category, LocalFile, TripDay};
    use crate::fs::{FileSystem, InMemoryFileSystem, SyncToAsyncFs, block_on_test};

    fn queue_on(fs: InMemoryFileSystem) -> PendingQueue {
        PendingQueue::new(
            Arc::new(SyncToAsyncFs::new(fs)),
            "/data/offlineQueue/pendingMemories.json",
        )
    }

    fn draft(title: &str) -> EntryDraft {
        EntryDraft::new(Category::Diary, TripDay::Day1).with_title(title)
    }

    #[test]
    fn test_missing_slot_reads_as_empty() {
        let queue = queue_on(InMemoryFileSystem::new());
        block_on_test(async {
            assert!(queue.is_empty().await.unwrap());
        });
    }

    #[test]
    fn test_push_preserves_order_and_survives_reopen() {
        let fs = InMemoryFileSystem::new();
        block_on_test(async {
            let queue = queue_on(fs.clone());
            queue.push(draft("first")).await.unwrap();
            queue
                .push(draft("second").with_file(LocalFile::new("p.jpg", vec![9; 4])))
                .await
                .unwrap();

            // A new handle over the same storage sees the same records
            let reopened = queue_on(fs.clone());
            let records = reopened.load().await.unwrap();
            let titles: Vec<_> = records.iter().map(|r| r.draft.title.as_str()).collect();
            assert_eq!(titles, vec!["first", "second"]);
            assert_eq!(records[1].draft.files[0].bytes, vec![9; 4]);
        });
        assert_eq!(
            fs.list_all_files(),
            vec![PathBuf::from("/data/offlineQueue/pendingMemories.json")]
        );
    }

    #[test]
    fn test_remove_keeps_records_added_later() {
        let queue = queue_on(InMemoryFileSystem::new());
        block_on_test(async {
            let a = queue.push(draft("a")).await.unwrap().record;
            let b = queue.push(draft("b")).await.unwrap();
            assert_eq!(b.pending, 2);
            let snapshot: Vec<Uuid> = vec![a.queue_id, b.record.queue_id];

            queue.push(draft("late")).await.unwrap();

            assert_eq!(queue.remove(&snapshot).await.unwrap(), 2);
            let left = queue.load().await.unwrap();
            assert_eq!(left.len(), 1);
            assert_eq!(left[0].draft.title, "late");
        });
    }

    #[test]
    fn test_corrupt_slot_is_local_persistence_error() {
        let fs = InMemoryFileSystem::new();
        fs.write_file(
            Path::new("/data/offlineQueue/pendingMemories.json"),
            "{not json",
        )
        .unwrap();
        let queue = queue_on(fs);
        block_on_test(async {
            let err = queue.push(draft("x")).await.unwrap_err();
            assert!(matches!(err, TrekError::LocalPersistence { .. }));
        });
    }

    #[test]
    fn test_clear_empties_slot() {
        let queue = queue_on(InMemoryFileSystem::new());
        block_on_test(async {
            queue.push(draft("a")).await.unwrap();
            queue.clear().await.unwrap();
            assert_eq!(queue.len().await.unwrap(), 0);
        });
    }
}
