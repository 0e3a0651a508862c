//! Submission routing.
//!
//! A validated draft either goes straight to the remote store (online) or is
//! parked in the offline queue (offline). Never both.

use std::sync::Arc;

use serde::Serialize;

use super::SyncContext;
use crate::entry::{Entry, EntryDraft, PendingEntry};
use crate::error::Result;
use crate::status::Status;

/// Where a submitted draft ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum Submission {
    /// Stored remotely and shown in the entry set.
    Saved(Entry),
    /// Parked in the offline queue until the next drain.
    Queued(PendingEntry),
}

impl Submission {
    /// Whether the draft is durably stored remotely.
    pub fn is_saved(&self) -> bool {
        matches!(self, Submission::Saved(_))
    }
}

/// Entry point for new memories.
#[derive(Debug)]
pub struct SubmissionGate {
    ctx: Arc<SyncContext>,
}

impl SubmissionGate {
    /// Create a gate over a shared context.
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self { ctx }
    }

    /// Submit a draft.
    ///
    /// Blank drafts are rejected with [`TrekError::EmptyEntry`] before anything
    /// is touched. Offline drafts are queued verbatim. Online drafts are
    /// uploaded and inserted; on failure the error is returned and neither the
    /// queue nor the entry set changes.
    ///
    /// [`TrekError::EmptyEntry`]: crate::error::TrekError::EmptyEntry
    pub async fn submit(&self, draft: EntryDraft) -> Result<Submission> {
        draft.validate()?;

        if !self.ctx.connectivity().is_online() {
            let queued = self.ctx.queue().push(draft).await?;
            self.ctx.status().publish(Status::QueuedOffline {
                pending: queued.pending,
            });
            return Ok(Submission::Queued(queued.record));
        }

        match self.ctx.upload_and_insert(&draft).await {
            Ok(entry) => {
                log::info!("saved memory {} ({})", entry.id, entry.title);
                self.ctx.update_entries(|set| set.prepend(entry.clone()));
                self.ctx.status().publish(Status::Saved);
                Ok(Submission::Saved(entry))
            }
            Err(e) => {
                self.ctx.status().publish(Status::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Category, LocalFile, TripDay};
    use crate::error::TrekError;
    use crate::fs::block_on_test;
    use crate::test_utils::TestHarness;

    #[test]
    fn test_blank_draft_is_rejected_without_side_effects() {
        for h in [TestHarness::online(), TestHarness::offline()] {
            let gate = SubmissionGate::new(h.ctx.clone());
            let blank = EntryDraft::new(Category::Photo, TripDay::Day1)
                .with_title("  ")
                .with_notes("\n");

            let err = block_on_test(gate.submit(blank)).unwrap_err();

            assert!(matches!(err, TrekError::EmptyEntry));
            assert_eq!(h.remote.calls().total(), 0);
            assert!(block_on_test(h.ctx.queue().is_empty()).unwrap());
            assert_eq!(h.ctx.status().current(), Status::Idle);
        }
    }

    #[test]
    fn test_offline_submission_is_queued_once_and_not_shown() {
        let h = TestHarness::offline();
        let gate = SubmissionGate::new(h.ctx.clone());
        let draft = EntryDraft::new(Category::Photo, TripDay::Day3)
            .with_title("Martin's Cove")
            .with_file(LocalFile::new("cove.jpg", vec![7; 16]));

        let submission = block_on_test(gate.submit(draft.clone())).unwrap();

        let Submission::Queued(record) = submission else {
            panic!("expected queued submission");
        };
        assert_eq!(record.draft, draft);
        let queued = block_on_test(h.ctx.queue().load()).unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].queue_id, record.queue_id);
        assert!(h.ctx.entries().is_empty());
        assert_eq!(h.remote.calls().total(), 0);
        assert_eq!(
            h.ctx.status().current(),
            Status::QueuedOffline { pending: 1 }
        );
    }

    #[test]
    fn test_online_submission_is_shown_once_and_never_queued() {
        let h = TestHarness::online();
        let gate = SubmissionGate::new(h.ctx.clone());
        let draft = EntryDraft::new(Category::Video, TripDay::Day1)
            .with_title("River crossing")
            .with_file(LocalFile::new("crossing.mp4", vec![0; 8]));

        let submission = block_on_test(gate.submit(draft)).unwrap();

        assert!(submission.is_saved());
        let set = h.ctx.entries();
        assert_eq!(set.len(), 1);
        assert_eq!(set.entries()[0].title, "River crossing");
        assert_eq!(set.entries()[0].media[0].mime_type, "video/mp4");
        assert!(block_on_test(h.ctx.queue().is_empty()).unwrap());
        assert_eq!(h.remote.calls().inserts, 1);
        assert_eq!(h.ctx.status().current(), Status::Saved);
    }

    #[test]
    fn test_online_failure_leaves_everything_untouched() {
        let h = TestHarness::online();
        let gate = SubmissionGate::new(h.ctx.clone());
        h.remote.fail_insert_call(1);
        let draft = EntryDraft::new(Category::Photo, TripDay::Day2)
            .with_title("Sweetwater")
            .with_file(LocalFile::new("river.jpg", vec![3; 4]));

        let err = block_on_test(gate.submit(draft)).unwrap_err();

        assert!(err.is_remote());
        assert!(h.ctx.entries().is_empty());
        assert!(block_on_test(h.ctx.queue().is_empty()).unwrap());
        assert_eq!(h.remote.store().object_count(), 0);
        assert!(matches!(h.ctx.status().current(), Status::Error { .. }));
    }

    #[test]
    fn test_online_untitled_draft_gets_placeholder() {
        let h = TestHarness::online();
        let gate = SubmissionGate::new(h.ctx.clone());
        let draft = EntryDraft::new(Category::Diary, TripDay::Day2)
            .with_notes("  Crossed the river today  ");

        let Submission::Saved(entry) = block_on_test(gate.submit(draft)).unwrap() else {
            panic!("expected saved submission");
        };

        assert_eq!(entry.title, "(Untitled memory)");
        assert_eq!(entry.notes, "Crossed the river today");
    }
}
