//! In-memory remote store.
//!
//! Records and objects live in `RwLock`-guarded maps and are lost when dropped.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::Utc;

use super::{RemoteStore, sort_newest_first};
use crate::entry::{Entry, EntryId, MediaReference, NewEntry};
use crate::fs::BoxFuture;

/// An object held by [`MemoryRemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Raw content.
    pub bytes: Vec<u8>,
    /// MIME type given at upload.
    pub mime_type: String,
}

/// Remote store kept entirely in memory.
#[derive(Debug)]
pub struct MemoryRemoteStore {
    base_url: String,
    records: RwLock<Vec<Entry>>,
    objects: RwLock<HashMap<String, StoredObject>>,
    next_id: AtomicI64,
    available: AtomicBool,
}

impl MemoryRemoteStore {
    /// Create an empty store issuing URLs below `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            records: RwLock::new(Vec::new()),
            objects: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Mark the store reachable or unreachable. Unreachable stores fail every call.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshot of all records, newest first.
    pub fn entries(&self) -> Vec<Entry> {
        let mut entries = self.records.read().unwrap_or_else(|e| e.into_inner()).clone();
        sort_newest_first(&mut entries);
        entries
    }

    /// Object stored at `path`, if any.
    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn check_available(&self) -> Result<(), String> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err("remote store is unreachable".to_string())
        }
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new("memory://trip-media")
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn insert_entry(&self, record: NewEntry) -> BoxFuture<'_, Result<Entry, String>> {
        Box::pin(async move {
            self.check_available()?;
            let entry = Entry {
                id: EntryId(self.next_id.fetch_add(1, Ordering::SeqCst)),
                category: record.category,
                day: record.day,
                title: record.title,
                notes: record.notes,
                media: record.media,
                created_at: Utc::now(),
            };
            self.records
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .push(entry.clone());
            Ok(entry)
        })
    }

    fn query_entries(&self) -> BoxFuture<'_, Result<Vec<Entry>, String>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.entries())
        })
    }

    fn delete_entry(&self, id: EntryId) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            self.check_available()?;
            self.records
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|e| e.id != id);
            Ok(())
        })
    }

    fn update_entry_media(
        &self,
        id: EntryId,
        media: Vec<MediaReference>,
    ) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            self.check_available()?;
            let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
            match records.iter_mut().find(|e| e.id == id) {
                Some(entry) => {
                    entry.media = media;
                    Ok(())
                }
                None => Err(format!("memory {} not found", id)),
            }
        })
    }

    fn upload_object(
        &self,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> BoxFuture<'_, Result<(), String>> {
        let path = path.to_string();
        let object = StoredObject {
            bytes: content.to_vec(),
            mime_type: mime_type.to_string(),
        };
        Box::pin(async move {
            self.check_available()?;
            let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
            if objects.contains_key(&path) {
                return Err(format!("object {} already exists", path));
            }
            objects.insert(path, object);
            Ok(())
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn delete_objects(&self, paths: Vec<String>) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            self.check_available()?;
            let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
            for path in &paths {
                objects.remove(path);
            }
            Ok(())
        })
    }

    fn is_available(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.available.load(Ordering::SeqCst) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Category, TripDay};
    use crate::fs::block_on_test;

    fn record(title: &str) -> NewEntry {
        NewEntry {
            category: Category::Diary,
            day: TripDay::Day1,
            title: title.to_string(),
            notes: String::new(),
            media: vec![],
        }
    }

    #[test]
    fn test_insert_assigns_increasing_ids_and_query_is_newest_first() {
        let store = MemoryRemoteStore::default();
        block_on_test(async {
            let a = store.insert_entry(record("a")).await.unwrap();
            let b = store.insert_entry(record("b")).await.unwrap();
            assert!(b.id > a.id);

            let listed = store.query_entries().await.unwrap();
            assert_eq!(listed[0].id, b.id);
            assert_eq!(listed[1].id, a.id);
        });
    }

    #[test]
    fn test_deleting_objects_twice_is_fine() {
        let store = MemoryRemoteStore::default();
        block_on_test(async {
            store.upload_object("1-x.jpg", b"jpg", "image/jpeg").await.unwrap();
            store.delete_objects(vec!["1-x.jpg".into()]).await.unwrap();
            store.delete_objects(vec!["1-x.jpg".into()]).await.unwrap();
            assert_eq!(store.object_count(), 0);
        });
    }

    #[test]
    fn test_unavailable_store_rejects_writes() {
        let store = MemoryRemoteStore::default();
        store.set_available(false);
        block_on_test(async {
            assert!(!store.is_available().await);
            assert!(store.insert_entry(record("a")).await.is_err());
        });
        assert!(store.entries().is_empty());
    }

    #[test]
    fn test_public_url_joins_base() {
        let store = MemoryRemoteStore::new("https://cdn.example/trip-media/");
        assert_eq!(
            store.public_url("1-abc.png"),
            "https://cdn.example/trip-media/1-abc.png"
        );
    }
}
