//! Filesystem-backed remote store.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/memories.json        record table (next id + records)
//! <root>/<bucket>/<path>      uploaded objects
//! ```
//!
//! The store counts as reachable only while `<root>` exists, so pointing it at a
//! network mount gives a real online/offline signal.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{RemoteStore, sort_newest_first};
use crate::entry::{Entry, EntryId, MediaReference, NewEntry};
use crate::fs::{AsyncFileSystem, BoxFuture};

const RECORDS_FILE: &str = "memories.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordTable {
    next_id: i64,
    memories: Vec<Entry>,
}

/// Remote store kept in a directory.
pub struct FsRemoteStore {
    fs: Arc<dyn AsyncFileSystem>,
    root: PathBuf,
    bucket: String,
    base_url: String,
    table_lock: Mutex<()>,
}

impl FsRemoteStore {
    /// Create a store rooted at `root`, keeping objects in `root/bucket`.
    pub fn new(
        fs: Arc<dyn AsyncFileSystem>,
        root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            root: root.into(),
            bucket: bucket.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            table_lock: Mutex::new(()),
        }
    }

    fn records_path(&self) -> PathBuf {
        self.root.join(RECORDS_FILE)
    }

    fn object_path(&self, path: &str) -> Result<PathBuf, String> {
        if path.is_empty() || path.contains('/') || path.contains('\\') || path.starts_with('.') {
            return Err(format!("invalid storage path '{}'", path));
        }
        Ok(self.root.join(&self.bucket).join(path))
    }

    async fn ensure_reachable(&self) -> Result<(), String> {
        if self.fs.exists(&self.root).await {
            Ok(())
        } else {
            Err(format!(
                "remote store at {} is unreachable",
                self.root.display()
            ))
        }
    }

    async fn read_table(&self) -> Result<RecordTable, String> {
        let path = self.records_path();
        if !self.fs.exists(&path).await {
            return Ok(RecordTable {
                next_id: 1,
                memories: Vec::new(),
            });
        }
        let contents = self
            .fs
            .read_to_string(&path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    async fn write_table(&self, table: &RecordTable) -> Result<(), String> {
        let path = self.records_path();
        let contents = serde_json::to_string_pretty(table)
            .map_err(|e| format!("Failed to serialize records: {}", e))?;
        let tmp = path.with_extension("json.tmp");
        self.fs
            .write_file(&tmp, &contents)
            .await
            .map_err(|e| format!("Failed to write {}: {}", tmp.display(), e))?;
        self.fs
            .replace_file(&tmp, &path)
            .await
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }
}

impl RemoteStore for FsRemoteStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn insert_entry(&self, record: NewEntry) -> BoxFuture<'_, Result<Entry, String>> {
        Box::pin(async move {
            self.ensure_reachable().await?;
            let _guard = self.table_lock.lock().await;
            let mut table = self.read_table().await?;
            let entry = Entry {
                id: EntryId(table.next_id.max(1)),
                category: record.category,
                day: record.day,
                title: record.title,
                notes: record.notes,
                media: record.media,
                created_at: Utc::now(),
            };
            table.next_id = entry.id.0 + 1;
            table.memories.push(entry.clone());
            self.write_table(&table).await?;
            Ok(entry)
        })
    }

    fn query_entries(&self) -> BoxFuture<'_, Result<Vec<Entry>, String>> {
        Box::pin(async move {
            self.ensure_reachable().await?;
            let _guard = self.table_lock.lock().await;
            let mut memories = self.read_table().await?.memories;
            sort_newest_first(&mut memories);
            Ok(memories)
        })
    }

    fn delete_entry(&self, id: EntryId) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            self.ensure_reachable().await?;
            let _guard = self.table_lock.lock().await;
            let mut table = self.read_table().await?;
            let before = table.memories.len();
            table.memories.retain(|e| e.id != id);
            if table.memories.len() != before {
                self.write_table(&table).await?;
            }
            Ok(())
        })
    }

    fn update_entry_media(
        &self,
        id: EntryId,
        media: Vec<MediaReference>,
    ) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            self.ensure_reachable().await?;
            let _guard = self.table_lock.lock().await;
            let mut table = self.read_table().await?;
            let entry = table
                .memories
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| format!("memory {} not found", id))?;
            entry.media = media;
            self.write_table(&table).await
        })
    }

    fn upload_object(
        &self,
        path: &str,
        content: &[u8],
        _mime_type: &str,
    ) -> BoxFuture<'_, Result<(), String>> {
        let path = path.to_string();
        let content = content.to_vec();
        Box::pin(async move {
            self.ensure_reachable().await?;
            let full_path = self.object_path(&path)?;
            if self.fs.exists(&full_path).await {
                return Err(format!("object {} already exists", path));
            }
            if let Some(parent) = full_path.parent() {
                self.fs
                    .create_dir_all(parent)
                    .await
                    .map_err(|e| format!("Failed to create bucket directory: {}", e))?;
            }
            self.fs
                .write_binary(&full_path, &content)
                .await
                .map_err(|e| format!("Failed to upload {}: {}", path, e))
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn delete_objects(&self, paths: Vec<String>) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            self.ensure_reachable().await?;
            let mut failures = Vec::new();
            for path in &paths {
                let full_path = match self.object_path(path) {
                    Ok(full_path) => full_path,
                    Err(e) => {
                        failures.push(e);
                        continue;
                    }
                };
                if !self.fs.exists(&full_path).await {
                    continue;
                }
                if let Err(e) = self.fs.delete_file(&full_path).await {
                    failures.push(format!("{}: {}", path, e));
                }
            }
            if failures.is_empty() {
                Ok(())
            } else {
                Err(format!("Failed to delete objects: {}", failures.join(", ")))
            }
        })
    }

    fn is_available(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.fs.exists(&self.root).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Category, TripDay};
    use crate::fs::{FileSystem, InMemoryFileSystem, SyncToAsyncFs, block_on_test};
    use std::path::Path;

    fn store_on(fs: &InMemoryFileSystem) -> FsRemoteStore {
        FsRemoteStore::new(
            Arc::new(SyncToAsyncFs::new(fs.clone())),
            "/mnt/trek",
            "trip-media",
            "https://cdn.example/trip-media",
        )
    }

    fn record(title: &str) -> NewEntry {
        NewEntry {
            category: Category::Photo,
            day: TripDay::Day2,
            title: title.to_string(),
            notes: "dusty".to_string(),
            media: vec![],
        }
    }

    #[test]
    fn test_missing_root_is_offline() {
        let fs = InMemoryFileSystem::new();
        let store = store_on(&fs);
        block_on_test(async {
            assert!(!store.is_available().await);
            let err = store.insert_entry(record("x")).await.unwrap_err();
            assert!(err.contains("unreachable"));

            fs.create_dir_all(Path::new("/mnt/trek")).unwrap();
            assert!(store.is_available().await);
        });
    }

    #[test]
    fn test_records_persist_and_ids_continue() {
        let fs = InMemoryFileSystem::new();
        fs.create_dir_all(Path::new("/mnt/trek")).unwrap();
        block_on_test(async {
            let first = store_on(&fs).insert_entry(record("a")).await.unwrap();
            let second = store_on(&fs).insert_entry(record("b")).await.unwrap();
            assert_eq!(first.id, EntryId(1));
            assert_eq!(second.id, EntryId(2));

            store_on(&fs).delete_entry(first.id).await.unwrap();
            let left = store_on(&fs).query_entries().await.unwrap();
            assert_eq!(left.len(), 1);
            assert_eq!(left[0].title, "b");
        });
    }

    #[test]
    fn test_objects_live_in_bucket_directory() {
        let fs = InMemoryFileSystem::new();
        fs.create_dir_all(Path::new("/mnt/trek")).unwrap();
        let store = store_on(&fs);
        block_on_test(async {
            store
                .upload_object("17-abc.jpg", b"\xff\xd8", "image/jpeg")
                .await
                .unwrap();
            assert_eq!(
                fs.read_binary(Path::new("/mnt/trek/trip-media/17-abc.jpg"))
                    .unwrap(),
                b"\xff\xd8"
            );

            store
                .delete_objects(vec!["17-abc.jpg".into(), "never-uploaded.png".into()])
                .await
                .unwrap();
            assert!(!fs.exists(Path::new("/mnt/trek/trip-media/17-abc.jpg")));
        });
    }

    #[test]
    fn test_rejects_path_traversal() {
        let fs = InMemoryFileSystem::new();
        fs.create_dir_all(Path::new("/mnt/trek")).unwrap();
        let store = store_on(&fs);
        block_on_test(async {
            assert!(store.upload_object("../escape", b"x", "text/plain").await.is_err());
        });
    }

    #[test]
    fn test_invalid_path_does_not_stop_batch_delete() {
        let fs = InMemoryFileSystem::new();
        fs.create_dir_all(Path::new("/mnt/trek")).unwrap();
        let store = store_on(&fs);
        block_on_test(async {
            for name in ["1-a.jpg", "2-b.jpg"] {
                store.upload_object(name, b"x", "image/jpeg").await.unwrap();
            }

            let err = store
                .delete_objects(vec!["1-a.jpg".into(), "../escape".into(), "2-b.jpg".into()])
                .await
                .unwrap_err();

            assert!(err.contains("../escape"));
            assert!(!fs.exists(Path::new("/mnt/trek/trip-media/1-a.jpg")));
            assert!(!fs.exists(Path::new("/mnt/trek/trip-media/2-b.jpg")));
        });
    }
}
