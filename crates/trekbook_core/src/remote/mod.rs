//! Remote store adapters.
//!
//! The remote side holds two things: a table of memory records and an object
//! store bucket for media. The sync core only talks to it through the
//! [`RemoteStore`] trait.
//!
//! # Adapters
//!
//! - [`MemoryRemoteStore`] - everything in memory; tests and demos
//! - [`FsRemoteStore`] - records as JSON and objects as files under a directory,
//!   e.g. a mounted share that may come and go

mod fs_store;
mod memory;

pub use fs_store::FsRemoteStore;
pub use memory::MemoryRemoteStore;

use rand::Rng;

use crate::entry::{Entry, EntryId, LocalFile, MediaReference, NewEntry};
use crate::fs::BoxFuture;

/// Trait for the record table and object store backing the journal.
///
/// Errors are provider messages; the sync core wraps them into
/// [`TrekError`](crate::error::TrekError) values naming the failed operation.
pub trait RemoteStore: Send + Sync {
    /// Human-readable name for this store
    fn name(&self) -> &str;

    /// Insert a record and return it with its assigned id and timestamp
    fn insert_entry(&self, record: NewEntry) -> BoxFuture<'_, Result<Entry, String>>;

    /// All records, newest first
    fn query_entries(&self) -> BoxFuture<'_, Result<Vec<Entry>, String>>;

    /// Delete a record. Deleting an unknown id is not an error.
    fn delete_entry(&self, id: EntryId) -> BoxFuture<'_, Result<(), String>>;

    /// Replace the media list of a record
    fn update_entry_media(
        &self,
        id: EntryId,
        media: Vec<MediaReference>,
    ) -> BoxFuture<'_, Result<(), String>>;

    /// Upload an object to `path` inside the bucket
    fn upload_object(
        &self,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> BoxFuture<'_, Result<(), String>>;

    /// Public URL of the object at `path`
    fn public_url(&self, path: &str) -> String;

    /// Delete objects by path. Missing objects are ignored.
    fn delete_objects(&self, paths: Vec<String>) -> BoxFuture<'_, Result<(), String>>;

    /// Check if the store is reachable right now
    fn is_available(&self) -> BoxFuture<'_, bool>;
}

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 10;

/// Generate a collision-resistant storage path for an upload:
/// `<unix-millis>-<random base36>.<original extension>`.
pub fn storage_path_for(file: &LocalFile) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    match file.extension() {
        Some(ext) => format!("{}-{}.{}", millis, suffix, ext),
        None => format!("{}-{}", millis, suffix),
    }
}

/// Order entries newest first, breaking timestamp ties by id.
pub fn sort_newest_first(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_storage_path_keeps_extension() {
        let path = storage_path_for(&LocalFile::new("IMG_0042.JPG", vec![]));
        let (stem, ext) = path.rsplit_once('.').unwrap();
        assert_eq!(ext, "JPG");
        let (millis, suffix) = stem.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| SUFFIX_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_storage_path_without_extension() {
        let path = storage_path_for(&LocalFile::new("scan", vec![]));
        assert!(!path.contains('.'));
    }

    #[test]
    fn test_storage_paths_do_not_collide() {
        let file = LocalFile::new("a.png", vec![]);
        let paths: HashSet<String> = (0..500).map(|_| storage_path_for(&file)).collect();
        assert_eq!(paths.len(), 500);
    }
}
