//! Drain orchestrator.
//!
//! [`SyncEngine::drain`] flushes the offline queue to the remote store. Only one
//! drain runs at a time; a trigger that arrives while one is in flight returns
//! [`DrainOutcome::AlreadyRunning`] and does nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{DrainOutcome, DrainPolicy, SyncContext};
use crate::error::{Result, TrekError};
use crate::status::Status;

/// Flushes pending entries to the remote store.
pub struct SyncEngine {
    ctx: Arc<SyncContext>,
    policy: DrainPolicy,
    draining: AtomicBool,
}

/// Releases the single-flight flag when the drain ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncEngine {
    /// Create an engine over a shared context.
    pub fn new(ctx: Arc<SyncContext>, policy: DrainPolicy) -> Self {
        Self {
            ctx,
            policy,
            draining: AtomicBool::new(false),
        }
    }

    /// The shared context.
    pub fn context(&self) -> &Arc<SyncContext> {
        &self.ctx
    }

    /// Failure policy in effect.
    pub fn policy(&self) -> DrainPolicy {
        self.policy
    }

    /// Whether a drain is in flight.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<DrainGuard<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard(&self.draining))
    }

    /// Upload every queued entry in enqueue order.
    ///
    /// On success the processed records are removed from the queue (records
    /// enqueued meanwhile stay) and the entry set is rebuilt from the remote
    /// listing. On the first failure the drain stops and the error is returned;
    /// what stays queued depends on the [`DrainPolicy`].
    pub async fn drain(&self) -> Result<DrainOutcome> {
        let Some(_guard) = self.try_begin() else {
            log::debug!("drain already in progress, ignoring trigger");
            return Ok(DrainOutcome::AlreadyRunning);
        };

        if !self.ctx.connectivity().is_online() {
            log::debug!("offline, skipping drain");
            return Ok(DrainOutcome::Offline);
        }

        let batch = match self.ctx.queue().load().await {
            Ok(batch) => batch,
            Err(e) => {
                self.ctx.status().publish(Status::DrainedError {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };
        if batch.is_empty() {
            return Ok(DrainOutcome::Empty);
        }

        log::info!("draining {} pending memories", batch.len());
        self.ctx.status().publish(Status::Draining {
            pending: batch.len(),
        });

        for (index, pending) in batch.iter().enumerate() {
            let step = async {
                let entry = self.ctx.upload_and_insert(&pending.draft).await?;
                log::debug!(
                    "uploaded queued memory {} as entry {}",
                    pending.queue_id,
                    entry.id
                );
                if self.policy == DrainPolicy::MarkCompleted {
                    self.ctx.queue().remove(&[pending.queue_id]).await?;
                }
                Ok::<_, TrekError>(())
            };
            if let Err(e) = step.await {
                log::warn!(
                    "drain aborted at record {} of {}: {}",
                    index + 1,
                    batch.len(),
                    e
                );
                self.ctx.status().publish(Status::DrainedError {
                    message: e.to_string(),
                });
                return Err(e);
            }
        }

        if self.policy == DrainPolicy::AtLeastOnce {
            let ids: Vec<_> = batch.iter().map(|p| p.queue_id).collect();
            if let Err(e) = self.ctx.queue().remove(&ids).await {
                self.ctx.status().publish(Status::DrainedError {
                    message: e.to_string(),
                });
                return Err(e);
            }
        }

        let refreshed = match self.ctx.refresh().await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("drain finished but refreshing entries failed: {}", e);
                false
            }
        };

        self.ctx.status().publish(Status::DrainedSuccess {
            uploaded: batch.len(),
        });
        Ok(DrainOutcome::Drained {
            uploaded: batch.len(),
            refreshed,
        })
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("policy", &self.policy)
            .field("draining", &self.is_draining())
            .finish()
    }
}
