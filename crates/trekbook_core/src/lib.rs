#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Configuration options
pub mod config;

/// Connectivity monitor and liveness probe
pub mod connectivity;

/// Memory records, drafts and queued drafts
pub mod entry;

/// The reconciled entry set shown to the user
pub mod entry_set;

/// Error (common error types)
pub mod error;

/// Filesystem abstraction
pub mod fs;

/// Local durable queue of pending memories
pub mod queue;

/// Remote store adapters
pub mod remote;

/// Sync service event loop
pub mod service;

/// User-facing sync status
pub mod status;

/// Offline-queue synchronization (submission, drain, deletion)
pub mod sync;

#[cfg(test)]
pub mod test_utils;
