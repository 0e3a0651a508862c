//! The sync service event loop.
//!
//! Every event source is funneled into one command channel: connectivity edges,
//! liveness probe ticks and requests from the view layer. The loop owns the
//! [`SyncEngine`] and [`SubmissionGate`] and spawns each piece of work so a
//! long drain never holds up a submission.
//!
//! ```ignore
//! let handle = SyncService::new(ctx, ServiceOptions::from_config(&config)).spawn();
//! handle.submit(draft).await?;
//! handle.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::connectivity::{ConnectivityEvent, Reachability, spawn_probe};
use crate::entry::{EntryDraft, EntryId};
use crate::entry_set::EntrySet;
use crate::error::{Result, TrekError};
use crate::status::Status;
use crate::sync::{
    DrainOutcome, DrainPolicy, Submission, SubmissionGate, SyncContext, SyncEngine, deletion,
};

/// Requests handled by the service loop.
#[derive(Debug)]
pub enum Command {
    /// A connectivity edge fired.
    ConnectivityChanged(ConnectivityEvent),
    /// The liveness probe found the device online.
    ProbeTick,
    /// The user asked for a sync.
    ManualSync {
        reply: oneshot::Sender<Result<DrainOutcome>>,
    },
    /// A new memory.
    Submit {
        draft: EntryDraft,
        reply: oneshot::Sender<Result<Submission>>,
    },
    /// Delete a memory and its media.
    DeleteEntry {
        id: EntryId,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Delete one media item of a memory.
    DeleteMedia {
        id: EntryId,
        path: String,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Rebuild the entry set from the remote store.
    Refresh {
        reply: oneshot::Sender<Result<usize>>,
    },
    /// Stop the loop.
    Shutdown,
}

/// Service tuning.
#[derive(Clone)]
pub struct ServiceOptions {
    /// Failure policy of drains.
    pub policy: DrainPolicy,
    /// Liveness probe cadence.
    pub probe_interval: Duration,
    /// Where the probe reads connectivity from. `None` leaves the flag to
    /// [`ServiceHandle::set_online`].
    pub reachability: Option<Arc<dyn Reachability>>,
}

impl ServiceOptions {
    /// Options taken from the user's config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            policy: config.drain_policy,
            probe_interval: config.probe_interval(),
            reachability: None,
        }
    }

    /// Use `source` for the liveness probe.
    pub fn with_reachability(mut self, source: Arc<dyn Reachability>) -> Self {
        self.reachability = Some(source);
        self
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            policy: DrainPolicy::default(),
            probe_interval: Duration::from_secs(crate::config::DEFAULT_PROBE_INTERVAL_SECS),
            reachability: None,
        }
    }
}

impl std::fmt::Debug for ServiceOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceOptions")
            .field("policy", &self.policy)
            .field("probe_interval", &self.probe_interval)
            .field("reachability", &self.reachability.is_some())
            .finish()
    }
}

/// Owns the sync components until [`spawn`](SyncService::spawn)ed.
pub struct SyncService {
    ctx: Arc<SyncContext>,
    engine: Arc<SyncEngine>,
    gate: Arc<SubmissionGate>,
    options: ServiceOptions,
}

impl SyncService {
    /// Wire the engine and gate to a shared context.
    pub fn new(ctx: Arc<SyncContext>, options: ServiceOptions) -> Self {
        Self {
            engine: Arc::new(SyncEngine::new(Arc::clone(&ctx), options.policy)),
            gate: Arc::new(SubmissionGate::new(Arc::clone(&ctx))),
            ctx,
            options,
        }
    }

    /// Start the loop and the liveness probe on the current tokio runtime.
    ///
    /// Connectivity edges are subscribed before this returns, so an edge
    /// reported right after spawning is not missed.
    pub fn spawn(self) -> ServiceHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Arc::clone(self.ctx.connectivity());

        let edges = tx.clone();
        let subscription = monitor.subscribe(Arc::new(move |event| {
            let _ = edges.send(Command::ConnectivityChanged(event));
        }));

        let ticks = tx.clone();
        let probe = spawn_probe(
            Arc::clone(&monitor),
            self.options.reachability.clone(),
            self.options.probe_interval,
            move || {
                let _ = ticks.send(Command::ProbeTick);
            },
        );

        let ctx = Arc::clone(&self.ctx);
        let task = tokio::spawn(async move {
            self.run(rx).await;
            probe.abort();
            monitor.unsubscribe(subscription);
            log::debug!("sync service stopped");
        });
        ServiceHandle { tx, ctx, task }
    }

    async fn run(&self, mut rx: mpsc::UnboundedReceiver<Command>) {
        if self.ctx.connectivity().is_online() {
            match self.ctx.refresh().await {
                Ok(count) => log::info!("loaded {} memories", count),
                Err(e) => log::warn!("initial load failed: {}", e),
            }
        }

        log::debug!("sync service started");
        while let Some(command) = rx.recv().await {
            if matches!(command, Command::Shutdown) {
                break;
            }
            self.handle(command);
        }
    }

    fn handle(&self, command: Command) {
        match command {
            Command::ConnectivityChanged(ConnectivityEvent::WentOnline) => {
                self.ctx.status().publish(Status::Online);
                self.spawn_drain(None);
            }
            Command::ConnectivityChanged(ConnectivityEvent::WentOffline) => {
                self.ctx.status().publish(Status::Offline);
            }
            Command::ProbeTick => self.spawn_drain(None),
            Command::ManualSync { reply } => {
                if self.ctx.connectivity().is_online() {
                    self.spawn_drain(Some(reply));
                } else {
                    self.ctx.status().publish(Status::Offline);
                    let _ = reply.send(Ok(DrainOutcome::Offline));
                }
            }
            Command::Submit { draft, reply } => {
                let gate = Arc::clone(&self.gate);
                tokio::spawn(async move {
                    let _ = reply.send(gate.submit(draft).await);
                });
            }
            Command::DeleteEntry { id, reply } => {
                let ctx = Arc::clone(&self.ctx);
                tokio::spawn(async move {
                    let result = match ctx.entries().get(id).cloned() {
                        Some(entry) => deletion::delete_entry(&ctx, &entry).await,
                        None => Err(TrekError::EntryNotFound(id)),
                    };
                    let _ = reply.send(result);
                });
            }
            Command::DeleteMedia { id, path, reply } => {
                let ctx = Arc::clone(&self.ctx);
                tokio::spawn(async move {
                    let _ = reply.send(deletion::delete_media(&ctx, id, &path).await);
                });
            }
            Command::Refresh { reply } => {
                let ctx = Arc::clone(&self.ctx);
                tokio::spawn(async move {
                    let _ = reply.send(ctx.refresh().await);
                });
            }
            Command::Shutdown => {}
        }
    }

    fn spawn_drain(&self, reply: Option<oneshot::Sender<Result<DrainOutcome>>>) {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            let result = engine.drain().await;
            match &result {
                Ok(DrainOutcome::Drained { uploaded, .. }) => {
                    log::info!("drain uploaded {} memories", uploaded)
                }
                Ok(outcome) => log::trace!("drain: {:?}", outcome),
                Err(e) => log::warn!("drain failed, will retry: {}", e),
            }
            if let Some(reply) = reply {
                let _ = reply.send(result);
            }
        });
    }
}

/// Client side of a running [`SyncService`].
#[derive(Debug)]
pub struct ServiceHandle {
    tx: mpsc::UnboundedSender<Command>,
    ctx: Arc<SyncContext>,
    task: JoinHandle<()>,
}

impl ServiceHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| TrekError::ServiceStopped)?;
        response.await.map_err(|_| TrekError::ServiceStopped)?
    }

    /// Submit a new memory.
    pub async fn submit(&self, draft: EntryDraft) -> Result<Submission> {
        self.request(|reply| Command::Submit { draft, reply }).await
    }

    /// Delete a memory shown in the entry set.
    pub async fn delete_entry(&self, id: EntryId) -> Result<()> {
        self.request(|reply| Command::DeleteEntry { id, reply }).await
    }

    /// Delete one media item of a memory.
    pub async fn delete_media(&self, id: EntryId, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.request(|reply| Command::DeleteMedia { id, path, reply })
            .await
    }

    /// Drain now if online.
    pub async fn sync_now(&self) -> Result<DrainOutcome> {
        self.request(|reply| Command::ManualSync { reply }).await
    }

    /// Rebuild the entry set from the remote store.
    pub async fn refresh(&self) -> Result<usize> {
        self.request(|reply| Command::Refresh { reply }).await
    }

    /// Report the platform's connectivity. Edges reach the loop as commands.
    pub fn set_online(&self, online: bool) -> Option<ConnectivityEvent> {
        self.ctx.connectivity().set_online(online)
    }

    /// Whether the device is online.
    pub fn is_online(&self) -> bool {
        self.ctx.connectivity().is_online()
    }

    /// Current banner.
    pub fn status(&self) -> Status {
        self.ctx.status().current()
    }

    /// Follow banner changes.
    pub fn subscribe_status(&self) -> watch::Receiver<Status> {
        self.ctx.status().subscribe()
    }

    /// Snapshot of the reconciled entry set.
    pub fn entries(&self) -> EntrySet {
        self.ctx.entries()
    }

    /// The shared context.
    pub fn context(&self) -> &Arc<SyncContext> {
        &self.ctx
    }

    /// Stop the loop and the probe, then wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            log::warn!("sync service task ended abnormally: {}", e);
        }
    }
}
