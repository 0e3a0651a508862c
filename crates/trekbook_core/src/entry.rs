//! Memory entries, drafts and queue records.
//!
//! Three shapes of the same memory exist over its lifetime:
//!
//! - [`EntryDraft`] - what the user composed: text fields plus raw [`LocalFile`]s.
//! - [`PendingEntry`] - a draft parked in the offline queue, tagged with a local
//!   queue id so the sync engine can remove exactly the records it processed.
//! - [`Entry`] - a memory accepted by the remote store. Only the remote store hands
//!   out [`EntryId`]s and creation timestamps, so holding an `Entry` means the
//!   record has been durably inserted upstream.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{Result, TrekError};
use crate::fs::AsyncFileSystem;

/// Title given to memories submitted without one.
pub const UNTITLED_PLACEHOLDER: &str = "(Untitled memory)";

/// The kind of memory being recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Photos (the form's default).
    #[default]
    Photo,
    /// Videos.
    Video,
    /// A written diary entry.
    Diary,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 3] = [Category::Photo, Category::Video, Category::Diary];

    /// Lowercase identifier used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Photo => "photo",
            Category::Video => "video",
            Category::Diary => "diary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TrekError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted || format!("{}s", c.as_str()) == wanted)
            .ok_or_else(|| TrekError::InvalidCategory(s.to_string()))
    }
}

/// The fixed set of trip days a memory can be filed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TripDay {
    /// First day of the trek.
    #[default]
    #[serde(rename = "Day 1")]
    Day1,
    /// Second day of the trek.
    #[serde(rename = "Day 2")]
    Day2,
    /// Third day of the trek.
    #[serde(rename = "Day 3")]
    Day3,
    /// The journey back.
    #[serde(rename = "Travel home")]
    TravelHome,
}

impl TripDay {
    /// All days in trip order.
    pub const ALL: [TripDay; 4] = [
        TripDay::Day1,
        TripDay::Day2,
        TripDay::Day3,
        TripDay::TravelHome,
    ];

    /// Display label, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            TripDay::Day1 => "Day 1",
            TripDay::Day2 => "Day 2",
            TripDay::Day3 => "Day 3",
            TripDay::TravelHome => "Travel home",
        }
    }
}

impl fmt::Display for TripDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for TripDay {
    type Err = TrekError;

    /// Accepts the label case-insensitively, with or without the inner space
    /// (`"Day 2"`, `"day2"`, `"travel home"`).
    fn from_str(s: &str) -> Result<Self> {
        let squash = |v: &str| v.to_lowercase().replace([' ', '-', '_'], "");
        let wanted = squash(s.trim());
        TripDay::ALL
            .into_iter()
            .find(|d| squash(d.label()) == wanted)
            .ok_or_else(|| TrekError::InvalidDay(s.to_string()))
    }
}

/// Identifier assigned by the remote store on first successful insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for EntryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(EntryId)
    }
}

/// A media object that has been uploaded to the remote object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MediaReference {
    /// Public, stable URL of the object.
    pub url: String,
    /// Original display name of the file.
    pub name: String,
    /// Storage path inside the bucket. Unique; used as the deletion key.
    pub path: String,
    /// MIME type reported for the file.
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// A memory durably stored by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Entry {
    /// Identifier assigned by the remote store.
    pub id: EntryId,
    /// Memory type.
    #[serde(rename = "type")]
    pub category: Category,
    /// Trip day the memory belongs to.
    pub day: TripDay,
    /// Display title (never blank once stored).
    pub title: String,
    /// Free-text notes.
    #[serde(default)]
    pub notes: String,
    /// Uploaded media, in upload order.
    #[serde(default)]
    pub media: Vec<MediaReference>,
    /// Creation timestamp assigned by the remote store.
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Find a media item by its storage path.
    pub fn media_at(&self, path: &str) -> Option<&MediaReference> {
        self.media.iter().find(|m| m.path == path)
    }

    /// Storage paths of every media item, in order.
    pub fn media_paths(&self) -> Vec<String> {
        self.media.iter().map(|m| m.path.clone()).collect()
    }
}

/// The record handed to the remote store for insertion.
///
/// It has no id and no timestamp; both are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    /// Memory type.
    #[serde(rename = "type")]
    pub category: Category,
    /// Trip day.
    pub day: TripDay,
    /// Title, already defaulted.
    pub title: String,
    /// Trimmed notes.
    pub notes: String,
    /// Media references collected during upload.
    pub media: Vec<MediaReference>,
}

/// A file picked on the local device whose bytes have not been uploaded yet.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    /// Original file name, including extension.
    pub name: String,
    /// MIME type of the content.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Raw content. Base64 inside the queue slot.
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl LocalFile {
    /// Create a file handle, inferring the MIME type from the name.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_from_name(&name).to_string();
        Self {
            name,
            mime_type,
            bytes,
        }
    }

    /// Override the inferred MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Read a file from `path` through the given filesystem.
    pub async fn read_from<FS: AsyncFileSystem + ?Sized>(fs: &FS, path: &Path) -> Result<Self> {
        let bytes = fs.read_binary(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, bytes))
    }

    /// Extension of the original name, without the dot.
    ///
    /// Returns `None` when the name has no extension.
    pub fn extension(&self) -> Option<&str> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            None
        } else {
            Some(ext)
        }
    }
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn mime_from_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "txt" | "md" => "text/plain",
        _ => "application/octet-stream",
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// A memory as composed by the user, before anything is uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    /// Memory type.
    #[serde(rename = "memoryType")]
    pub category: Category,
    /// Trip day.
    pub day: TripDay,
    /// Title as typed; may be blank.
    pub title: String,
    /// Notes as typed; may be blank.
    pub notes: String,
    /// Files picked for upload, in selection order.
    #[serde(default)]
    pub files: Vec<LocalFile>,
}

impl EntryDraft {
    /// Start a draft for the given category and day.
    pub fn new(category: Category, day: TripDay) -> Self {
        Self {
            category,
            day,
            ..Default::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Attach a file.
    pub fn with_file(mut self, file: LocalFile) -> Self {
        self.files.push(file);
        self
    }

    /// True when title, notes and file list are all empty or blank.
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.notes.trim().is_empty() && self.files.is_empty()
    }

    /// Reject drafts that carry nothing worth saving.
    pub fn validate(&self) -> Result<()> {
        if self.is_blank() {
            return Err(TrekError::EmptyEntry);
        }
        Ok(())
    }

    /// Title used at insert time: trimmed, or `placeholder` when blank.
    pub fn effective_title(&self, placeholder: &str) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            placeholder.to_string()
        } else {
            title.to_string()
        }
    }

    /// Build the insert payload once the files have been uploaded.
    pub fn to_new_entry(&self, media: Vec<MediaReference>, placeholder: &str) -> NewEntry {
        NewEntry {
            category: self.category,
            day: self.day,
            title: self.effective_title(placeholder),
            notes: self.notes.trim().to_string(),
            media,
        }
    }
}

/// A draft waiting in the offline queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    /// Local identity of the queue record.
    pub queue_id: Uuid,
    /// When the draft was parked.
    pub enqueued_at: DateTime<Utc>,
    /// The draft, stored verbatim.
    #[serde(flatten)]
    pub draft: EntryDraft,
}

impl PendingEntry {
    /// Wrap a draft with a fresh queue id.
    pub fn new(draft: EntryDraft) -> Self {
        Self {
            queue_id: Uuid::new_v4(),
            enqueued_at: Utc::now(),
            draft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_draft_is_rejected() {
        let draft = EntryDraft::new(Category::Diary, TripDay::Day1)
            .with_title("   ")
            .with_notes("\n");
        assert!(matches!(draft.validate(), Err(TrekError::EmptyEntry)));
    }

    #[test]
    fn test_single_file_is_enough() {
        let draft = EntryDraft::new(Category::Photo, TripDay::Day3)
            .with_file(LocalFile::new("cart.jpg", vec![1, 2, 3]));
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_title_defaults_only_when_building_record() {
        let draft = EntryDraft::new(Category::Diary, TripDay::Day2)
            .with_notes("  Crossed the river today ");
        assert_eq!(draft.title, "");

        let record = draft.to_new_entry(vec![], UNTITLED_PLACEHOLDER);
        assert_eq!(record.title, "(Untitled memory)");
        assert_eq!(record.notes, "Crossed the river today");
    }

    #[test]
    fn test_trip_day_parsing() {
        assert_eq!("Day 2".parse::<TripDay>().unwrap(), TripDay::Day2);
        assert_eq!("day3".parse::<TripDay>().unwrap(), TripDay::Day3);
        assert_eq!("travel home".parse::<TripDay>().unwrap(), TripDay::TravelHome);
        assert!(matches!(
            "Day 9".parse::<TripDay>(),
            Err(TrekError::InvalidDay(_))
        ));
    }

    #[test]
    fn test_category_parsing_accepts_plural() {
        assert_eq!("Photos".parse::<Category>().unwrap(), Category::Photo);
        assert_eq!("diary".parse::<Category>().unwrap(), Category::Diary);
        assert!("audio".parse::<Category>().is_err());
    }

    #[test]
    fn test_entry_uses_original_field_names() {
        let entry = Entry {
            id: EntryId(7),
            category: Category::Video,
            day: TripDay::TravelHome,
            title: "Bus ride".into(),
            notes: String::new(),
            media: vec![MediaReference {
                url: "https://cdn.example/trip-media/1-a.mp4".into(),
                name: "bus.mp4".into(),
                path: "1-a.mp4".into(),
                mime_type: "video/mp4".into(),
            }],
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["day"], "Travel home");
        assert_eq!(json["id"], 7);
        assert_eq!(json["media"][0]["type"], "video/mp4");
    }

    #[test]
    fn test_pending_entry_keeps_raw_bytes() {
        let pending = PendingEntry::new(
            EntryDraft::new(Category::Photo, TripDay::Day1)
                .with_file(LocalFile::new("handcart.png", vec![0, 159, 146, 150])),
        );
        let json = serde_json::to_string(&pending).unwrap();
        let back: PendingEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.draft.files[0].bytes, vec![0, 159, 146, 150]);
        assert_eq!(back.draft.files[0].mime_type, "image/png");
        assert_eq!(back.queue_id, pending.queue_id);
    }

    #[test]
    fn test_extension_detection() {
        assert_eq!(LocalFile::new("a.tar.gz", vec![]).extension(), Some("gz"));
        assert_eq!(LocalFile::new("README", vec![]).extension(), None);
        assert_eq!(LocalFile::new(".hidden", vec![]).extension(), None);
    }
}
