//! Offline-queue synchronization.
//!
//! # Architecture
//!
//! ```text
//!  View layer ── submit ──▶ SubmissionGate ──online──▶ upload_and_insert ──▶ RemoteStore
//!                                 │                           ▲
//!                              offline                        │
//!                                 ▼                           │
//!                           PendingQueue ────── drain ──▶ SyncEngine
//!                                                             │
//!                                       replace EntrySet ◀────┘
//! ```
//!
//! # Key Components
//!
//! - [`SyncContext`] - explicit owner of the queue, connectivity, remote store,
//!   reconciled entry set and status board
//! - [`SubmissionGate`] - routes new drafts to the remote store or the queue
//! - [`SyncEngine`] - single-flight drain of the queue
//! - [`deletion`] - entry and media deletion kept consistent with the entry set

/// Entry and media deletion
pub mod deletion;
/// Drain orchestrator
pub mod engine;
/// Submission routing
pub mod gate;

pub use engine::SyncEngine;
pub use gate::{SubmissionGate, Submission};

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::connectivity::ConnectivityMonitor;
use crate::entry::{Entry, EntryDraft, MediaReference, UNTITLED_PLACEHOLDER};
use crate::entry_set::EntrySet;
use crate::error::{Result, TrekError};
use crate::queue::PendingQueue;
use crate::remote::{RemoteStore, storage_path_for};
use crate::status::StatusBoard;

/// How a drain treats records that were inserted before a later record failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Keep the whole batch queued on failure. Records inserted before the
    /// failure are inserted again by the next drain.
    #[default]
    AtLeastOnce,
    /// Remove each record from the queue as soon as its insert succeeds, so a
    /// failure leaves only the unprocessed tail queued.
    MarkCompleted,
}

/// Result of a drain request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The queue was empty; nothing was sent anywhere.
    Empty,
    /// Another drain held the single-flight guard; this request was dropped.
    AlreadyRunning,
    /// Connectivity is down; the request was not attempted.
    Offline,
    /// Every record in the batch was inserted and removed from the queue.
    Drained {
        /// Records inserted.
        uploaded: usize,
        /// Whether the entry set was rebuilt from the remote listing.
        refreshed: bool,
    },
}

/// Shared state of the sync subsystem.
///
/// One context is created per process and handed to the gate, the engine and
/// the service loop. The entry set lock is never held across an await.
pub struct SyncContext {
    queue: PendingQueue,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<ConnectivityMonitor>,
    entries: RwLock<EntrySet>,
    status: StatusBoard,
    untitled_placeholder: String,
}

impl SyncContext {
    /// Create a context with an empty entry set.
    pub fn new(
        queue: PendingQueue,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            queue,
            remote,
            connectivity,
            entries: RwLock::new(EntrySet::new()),
            status: StatusBoard::new(),
            untitled_placeholder: UNTITLED_PLACEHOLDER.to_string(),
        }
    }

    /// Override the title used for drafts submitted without one.
    pub fn with_untitled_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.untitled_placeholder = placeholder.into();
        self
    }

    /// The offline queue.
    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// The remote store.
    pub fn remote(&self) -> &dyn RemoteStore {
        self.remote.as_ref()
    }

    /// The connectivity monitor.
    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.connectivity
    }

    /// The status board.
    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Title applied at insert time to drafts without one.
    pub fn untitled_placeholder(&self) -> &str {
        &self.untitled_placeholder
    }

    /// Copy of the reconciled entry set.
    pub fn entries(&self) -> EntrySet {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Mutate the reconciled entry set.
    pub fn update_entries<R>(&self, f: impl FnOnce(&mut EntrySet) -> R) -> R {
        let mut set = self.entries.write().unwrap_or_else(|e| e.into_inner());
        f(&mut set)
    }

    /// Rebuild the entry set from the remote listing. Returns the entry count.
    pub async fn refresh(&self) -> Result<usize> {
        let listing = self
            .remote
            .query_entries()
            .await
            .map_err(|e| TrekError::remote_read("query_entries", e))?;
        let count = listing.len();
        self.update_entries(|set| set.replace_all(listing));
        Ok(count)
    }

    /// Upload a draft's files and insert its record.
    ///
    /// This is the procedure shared by foreground submission and drains. The
    /// placeholder title and notes trimming are applied here, not when a draft
    /// is queued. If the insert fails, objects uploaded for this draft are
    /// removed on a best-effort basis.
    pub async fn upload_and_insert(&self, draft: &EntryDraft) -> Result<Entry> {
        let mut media: Vec<MediaReference> = Vec::with_capacity(draft.files.len());

        for file in &draft.files {
            let path = storage_path_for(file);
            if let Err(e) = self
                .remote
                .upload_object(&path, &file.bytes, &file.mime_type)
                .await
            {
                self.discard_uploads(&media).await;
                return Err(TrekError::remote_write("upload_object", e));
            }
            media.push(MediaReference {
                url: self.remote.public_url(&path),
                name: file.name.clone(),
                path,
                mime_type: file.mime_type.clone(),
            });
        }

        let record = draft.to_new_entry(media, &self.untitled_placeholder);
        let uploaded = record.media.clone();
        match self.remote.insert_entry(record).await {
            Ok(entry) => Ok(entry),
            Err(e) => {
                self.discard_uploads(&uploaded).await;
                Err(TrekError::remote_write("insert_entry", e))
            }
        }
    }

    async fn discard_uploads(&self, media: &[MediaReference]) {
        if media.is_empty() {
            return;
        }
        let paths: Vec<String> = media.iter().map(|m| m.path.clone()).collect();
        if let Err(e) = self.remote.delete_objects(paths).await {
            log::warn!(
                "could not remove {} orphaned upload(s): {}",
                media.len(),
                e
            );
        }
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("queue", &self.queue)
            .field("remote", &self.remote.name())
            .field("connectivity", &self.connectivity)
            .finish()
    }
}
