//! The reconciled entry set: the list of memories the user sees.
//!
//! It is ordered newest first. A drain replaces it wholesale with the remote
//! store's authoritative list; online submissions and deletions patch it in place.

use std::collections::BTreeMap;

use serde::Serialize;
use ts_rs::TS;

use crate::entry::{Category, Entry, EntryId, MediaReference, TripDay};
use crate::remote::sort_newest_first;

/// In-memory view model of synchronized memories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrySet {
    entries: Vec<Entry>,
}

impl EntrySet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a remote listing, normalizing the order.
    pub fn from_remote(mut entries: Vec<Entry>) -> Self {
        sort_newest_first(&mut entries);
        Self { entries }
    }

    /// Replace every entry with an authoritative listing.
    pub fn replace_all(&mut self, entries: Vec<Entry>) {
        *self = Self::from_remote(entries);
    }

    /// Put a freshly inserted entry at the top.
    ///
    /// An entry whose id is already present replaces the old copy instead of
    /// appearing twice.
    pub fn prepend(&mut self, entry: Entry) {
        self.entries.retain(|e| e.id != entry.id);
        self.entries.insert(0, entry);
    }

    /// Remove an entry, returning it if it was present.
    pub fn remove(&mut self, id: EntryId) -> Option<Entry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Drop one media item from an entry and return the entry's remaining media.
    ///
    /// Returns `None` if the entry is unknown.
    pub fn remove_media(&mut self, id: EntryId, path: &str) -> Option<Vec<MediaReference>> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        entry.media.retain(|m| m.path != path);
        Some(entry.media.clone())
    }

    /// Look up an entry by id.
    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Whether an entry with this id is shown.
    pub fn contains(&self, id: EntryId) -> bool {
        self.get(id).is_some()
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries grouped by trip day in trip order, newest first inside each day.
    pub fn by_day(&self) -> Vec<(TripDay, Vec<&Entry>)> {
        let mut groups: BTreeMap<TripDay, Vec<&Entry>> = BTreeMap::new();
        for entry in &self.entries {
            groups.entry(entry.day).or_default().push(entry);
        }
        groups.into_iter().collect()
    }

    /// Totals for the admin listing.
    pub fn admin_summary(&self) -> AdminSummary {
        let mut summary = AdminSummary {
            total: self.entries.len(),
            ..Default::default()
        };
        for entry in &self.entries {
            match entry.category {
                Category::Photo => summary.photos += 1,
                Category::Video => summary.videos += 1,
                Category::Diary => summary.diaries += 1,
            }
            summary.media_items += entry.media.len();
        }
        summary
    }
}

/// Counts shown at the top of the admin listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AdminSummary {
    /// Total memories.
    pub total: usize,
    /// Memories of type photo.
    pub photos: usize,
    /// Memories of type video.
    pub videos: usize,
    /// Memories of type diary.
    pub diaries: usize,
    /// Media items across all memories.
    pub media_items: usize,
}
