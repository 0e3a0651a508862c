//! User-facing sync status (the banner).
//!
//! The core publishes every status transition on a `tokio::sync::watch` channel;
//! view layers subscribe and render the latest value.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use ts_rs::TS;

/// Current banner state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Status {
    /// Nothing to report.
    #[default]
    Idle,
    /// Connectivity came back; a drain has been requested.
    Online,
    /// Connectivity was lost.
    Offline,
    /// A draft was parked in the offline queue.
    QueuedOffline {
        /// Records now waiting.
        pending: usize,
    },
    /// A drain is uploading the queue.
    Draining {
        /// Records in the batch.
        pending: usize,
    },
    /// A drain finished and the queue batch was cleared.
    DrainedSuccess {
        /// Records inserted.
        uploaded: usize,
    },
    /// A drain aborted; the queue is kept for the next attempt.
    DrainedError {
        /// Failure description.
        message: String,
    },
    /// An online submission was stored remotely.
    Saved,
    /// An online submission or deletion failed.
    Error {
        /// Failure description.
        message: String,
    },
}

/// Visual tone of a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    /// Progress or neutral information.
    Info,
    /// Completed successfully.
    Success,
    /// Offline or failed.
    Error,
}

impl Status {
    /// Banner tone, or `None` when no banner should be shown.
    pub fn kind(&self) -> Option<BannerKind> {
        match self {
            Status::Idle => None,
            Status::Online | Status::Draining { .. } => Some(BannerKind::Info),
            Status::DrainedSuccess { .. } | Status::Saved => Some(BannerKind::Success),
            Status::Offline
            | Status::QueuedOffline { .. }
            | Status::DrainedError { .. }
            | Status::Error { .. } => Some(BannerKind::Error),
        }
    }

    /// Banner text.
    pub fn message(&self) -> String {
        match self {
            Status::Idle => String::new(),
            Status::Online => "Online, syncing pending memories...".to_string(),
            Status::Offline => "Offline: new memories will upload later.".to_string(),
            Status::QueuedOffline { .. } => {
                "Offline: memory saved locally and will upload later.".to_string()
            }
            Status::Draining { .. } => "Uploading offline memories...".to_string(),
            Status::DrainedSuccess { .. } => "All pending memories uploaded!".to_string(),
            Status::DrainedError { message } => {
                format!("Uploading pending memories failed, will retry: {}", message)
            }
            Status::Saved => "Memory saved!".to_string(),
            Status::Error { message } => format!("Error saving memory: {}", message),
        }
    }
}

/// Publisher side of the status channel.
#[derive(Debug)]
pub struct StatusBoard {
    tx: watch::Sender<Status>,
}

impl StatusBoard {
    /// Start in [`Status::Idle`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Status::Idle);
        Self { tx }
    }

    /// Replace the current status and notify subscribers.
    pub fn publish(&self, status: Status) {
        log::debug!("status -> {:?}", status);
        self.tx.send_replace(status);
    }

    /// Latest published status.
    pub fn current(&self) -> Status {
        self.tx.borrow().clone()
    }

    /// Subscribe to future changes.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.tx.subscribe()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_subscribers() {
        let board = StatusBoard::new();
        let mut rx = board.subscribe();
        board.publish(Status::Draining { pending: 2 });
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Status::Draining { pending: 2 });
        assert_eq!(board.current(), Status::Draining { pending: 2 });
    }

    #[test]
    fn test_banner_tones() {
        assert_eq!(Status::Idle.kind(), None);
        assert_eq!(Status::Saved.kind(), Some(BannerKind::Success));
        assert_eq!(
            Status::QueuedOffline { pending: 1 }.kind(),
            Some(BannerKind::Error)
        );
        assert_eq!(
            Status::DrainedSuccess { uploaded: 3 }.message(),
            "All pending memories uploaded!"
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Status::DrainedError {
            message: "timeout".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "drained_error");
        assert_eq!(json["message"], "timeout");
    }
}
