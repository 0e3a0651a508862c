//! Test utilities for trekbook_core
//!
//! This module provides a scripted remote store and a ready-made sync context
//! shared across the test modules.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::connectivity::ConnectivityMonitor;
use crate::entry::{Entry, EntryId, MediaReference, NewEntry};
use crate::fs::{BoxFuture, InMemoryFileSystem, SyncToAsyncFs};
use crate::queue::PendingQueue;
use crate::remote::{MemoryRemoteStore, RemoteStore};
use crate::sync::{DrainPolicy, SyncContext, SyncEngine};

/// Number of calls made to each remote operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub inserts: usize,
    pub queries: usize,
    pub entry_deletes: usize,
    pub media_updates: usize,
    pub uploads: usize,
    pub object_deletes: usize,
}

impl CallCounts {
    /// All remote calls, availability checks excluded.
    pub fn total(&self) -> usize {
        self.inserts
            + self.queries
            + self.entry_deletes
            + self.media_updates
            + self.uploads
            + self.object_deletes
    }
}

/// A [`MemoryRemoteStore`] wrapper that records calls and fails on demand.
#[derive(Default)]
pub struct ScriptedRemote {
    store: MemoryRemoteStore,
    calls: Mutex<CallCounts>,
    inserted_titles: Mutex<Vec<String>>,
    deleted_batches: Mutex<Vec<Vec<String>>>,
    fail_insert_at: AtomicUsize,
    fail_uploads: AtomicBool,
    fail_queries: AtomicBool,
    fail_object_deletes: AtomicBool,
    fail_media_updates: AtomicBool,
    insert_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, for assertions and availability toggles.
    pub fn store(&self) -> &MemoryRemoteStore {
        &self.store
    }

    pub fn calls(&self) -> CallCounts {
        *self.calls.lock().unwrap()
    }

    /// Titles of successful inserts, in call order.
    pub fn inserted_titles(&self) -> Vec<String> {
        self.inserted_titles.lock().unwrap().clone()
    }

    /// Path lists passed to every `delete_objects` call.
    pub fn deleted_batches(&self) -> Vec<Vec<String>> {
        self.deleted_batches.lock().unwrap().clone()
    }

    /// Fail the k-th insert call from now (1-indexed). Only that call fails.
    pub fn fail_insert_call(&self, k: usize) {
        let target = self.calls().inserts + k;
        self.fail_insert_at.store(target, Ordering::SeqCst);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_object_deletes(&self, fail: bool) {
        self.fail_object_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_media_updates(&self, fail: bool) {
        self.fail_media_updates.store(fail, Ordering::SeqCst);
    }

    /// Hold every insert until a permit is added to the returned semaphore.
    /// Each insert consumes one permit.
    pub fn gate_inserts(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.insert_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn count(&self, f: impl FnOnce(&mut CallCounts) -> usize) -> usize {
        let mut calls = self.calls.lock().unwrap();
        f(&mut calls)
    }
}

fn scripted_failure(flag: &AtomicBool, operation: &str) -> Result<(), String> {
    if flag.load(Ordering::SeqCst) {
        Err(format!("scripted {} failure", operation))
    } else {
        Ok(())
    }
}

impl RemoteStore for ScriptedRemote {
    fn name(&self) -> &str {
        "scripted"
    }

    fn insert_entry(&self, record: NewEntry) -> BoxFuture<'_, Result<Entry, String>> {
        Box::pin(async move {
            let call = self.count(|c| {
                c.inserts += 1;
                c.inserts
            });
            let gate = self.insert_gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.acquire()
                    .await
                    .map_err(|e| e.to_string())?
                    .forget();
            }
            if self.fail_insert_at.load(Ordering::SeqCst) == call {
                return Err(format!("scripted insert failure on call {}", call));
            }
            let title = record.title.clone();
            let entry = self.store.insert_entry(record).await?;
            self.inserted_titles.lock().unwrap().push(title);
            Ok(entry)
        })
    }

    fn query_entries(&self) -> BoxFuture<'_, Result<Vec<Entry>, String>> {
        Box::pin(async move {
            self.count(|c| {
                c.queries += 1;
                c.queries
            });
            scripted_failure(&self.fail_queries, "query")?;
            self.store.query_entries().await
        })
    }

    fn delete_entry(&self, id: EntryId) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            self.count(|c| {
                c.entry_deletes += 1;
                c.entry_deletes
            });
            self.store.delete_entry(id).await
        })
    }

    fn update_entry_media(
        &self,
        id: EntryId,
        media: Vec<MediaReference>,
    ) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            self.count(|c| {
                c.media_updates += 1;
                c.media_updates
            });
            scripted_failure(&self.fail_media_updates, "media update")?;
            self.store.update_entry_media(id, media).await
        })
    }

    fn upload_object(
        &self,
        path: &str,
        content: &[u8],
        mime_type: &str,
    ) -> BoxFuture<'_, Result<(), String>> {
        let upload = self.store.upload_object(path, content, mime_type);
        Box::pin(async move {
            self.count(|c| {
                c.uploads += 1;
                c.uploads
            });
            scripted_failure(&self.fail_uploads, "upload")?;
            upload.await
        })
    }

    fn public_url(&self, path: &str) -> String {
        self.store.public_url(path)
    }

    fn delete_objects(&self, paths: Vec<String>) -> BoxFuture<'_, Result<(), String>> {
        Box::pin(async move {
            self.count(|c| {
                c.object_deletes += 1;
                c.object_deletes
            });
            self.deleted_batches.lock().unwrap().push(paths.clone());
            scripted_failure(&self.fail_object_deletes, "object delete")?;
            self.store.delete_objects(paths).await
        })
    }

    fn is_available(&self) -> BoxFuture<'_, bool> {
        self.store.is_available()
    }
}

/// A sync context over an in-memory queue and a [`ScriptedRemote`].
pub struct TestHarness {
    pub fs: InMemoryFileSystem,
    pub remote: Arc<ScriptedRemote>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub ctx: Arc<SyncContext>,
}

impl TestHarness {
    pub fn online() -> Self {
        Self::build(true, |ctx| ctx)
    }

    pub fn offline() -> Self {
        Self::build(false, |ctx| ctx)
    }

    /// Online harness with a customized context.
    pub fn online_with(customize: impl FnOnce(SyncContext) -> SyncContext) -> Self {
        Self::build(true, customize)
    }

    fn build(online: bool, customize: impl FnOnce(SyncContext) -> SyncContext) -> Self {
        let fs = InMemoryFileSystem::new();
        let remote = Arc::new(ScriptedRemote::new());
        let connectivity = Arc::new(ConnectivityMonitor::new(online));
        let queue = PendingQueue::new(
            Arc::new(SyncToAsyncFs::new(fs.clone())),
            PathBuf::from("/device/offlineQueue/pendingMemories.json"),
        );
        let ctx = SyncContext::new(
            queue,
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
            Arc::clone(&connectivity),
        );
        Self {
            fs,
            remote,
            connectivity,
            ctx: Arc::new(customize(ctx)),
        }
    }

    pub fn engine(&self, policy: DrainPolicy) -> SyncEngine {
        SyncEngine::new(Arc::clone(&self.ctx), policy)
    }
}
