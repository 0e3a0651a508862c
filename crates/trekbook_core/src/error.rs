use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::entry::EntryId;

/// Unified error type for trekbook operations
#[derive(Debug, Error)]
pub enum TrekError {
    // Validation errors
    #[error("Please enter a title, notes, or at least one photo.")]
    EmptyEntry,

    #[error("Unknown trip day '{0}'. Expected one of: Day 1, Day 2, Day 3, Travel home")]
    InvalidDay(String),

    #[error("Unknown memory type '{0}'. Expected one of: photo, video, diary")]
    InvalidCategory(String),

    // Remote store errors
    #[error("Remote write failed during {operation}: {message}")]
    RemoteWrite {
        operation: &'static str,
        message: String,
    },

    #[error("Remote read failed during {operation}: {message}")]
    RemoteRead {
        operation: &'static str,
        message: String,
    },

    #[error("Memory {0} not found")]
    EntryNotFound(EntryId),

    #[error("Memory {id} has no media at '{path}'")]
    MediaNotFound { id: EntryId, path: String },

    // Local persistence errors
    #[error("Local queue at '{path}' could not be persisted: {message}")]
    LocalPersistence { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Config errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    // Service errors
    #[error("Sync service is not running")]
    ServiceStopped,
}

/// Result type alias for trekbook operations
pub type Result<T> = std::result::Result<T, TrekError>;

impl TrekError {
    /// Build a [`TrekError::RemoteWrite`] from a provider error message.
    pub fn remote_write(operation: &'static str, message: impl Into<String>) -> Self {
        TrekError::RemoteWrite {
            operation,
            message: message.into(),
        }
    }

    /// Build a [`TrekError::RemoteRead`] from a provider error message.
    pub fn remote_read(operation: &'static str, message: impl Into<String>) -> Self {
        TrekError::RemoteRead {
            operation,
            message: message.into(),
        }
    }

    /// Build a [`TrekError::LocalPersistence`] for the queue slot at `path`.
    pub fn local_persistence(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        TrekError::LocalPersistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error came from the remote store.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            TrekError::RemoteWrite { .. } | TrekError::RemoteRead { .. }
        )
    }

    /// Convert to a serializable representation for IPC
    pub fn to_serializable(&self) -> SerializableError {
        SerializableError::from(self)
    }
}

/// A serializable representation of TrekError for IPC and JSON output
#[derive(Debug, Clone, Serialize)]
pub struct SerializableError {
    /// Error kind/variant name
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// Associated path (if applicable)
    pub path: Option<PathBuf>,
}

impl From<&TrekError> for SerializableError {
    fn from(err: &TrekError) -> Self {
        let kind = match err {
            TrekError::EmptyEntry => "EmptyEntry",
            TrekError::InvalidDay(_) => "InvalidDay",
            TrekError::InvalidCategory(_) => "InvalidCategory",
            TrekError::RemoteWrite { .. } => "RemoteWrite",
            TrekError::RemoteRead { .. } => "RemoteRead",
            TrekError::EntryNotFound(_) => "EntryNotFound",
            TrekError::MediaNotFound { .. } => "MediaNotFound",
            TrekError::LocalPersistence { .. } => "LocalPersistence",
            TrekError::Io(_) => "Io",
            TrekError::Json(_) => "Json",
            TrekError::ConfigParse(_) => "ConfigParse",
            TrekError::ConfigSerialize(_) => "ConfigSerialize",
            TrekError::NoConfigDir => "NoConfigDir",
            TrekError::ServiceStopped => "ServiceStopped",
        }
        .to_string();

        let path = match err {
            TrekError::LocalPersistence { path, .. } => Some(path.clone()),
            _ => None,
        };

        Self {
            kind,
            message: err.to_string(),
            path,
        }
    }
}

impl From<TrekError> for SerializableError {
    fn from(err: TrekError) -> Self {
        SerializableError::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_write_message_names_operation() {
        let err = TrekError::remote_write("upload_object", "connection reset");
        assert_eq!(
            err.to_string(),
            "Remote write failed during upload_object: connection reset"
        );
        assert!(err.is_remote());
    }

    #[test]
    fn test_serializable_keeps_queue_path() {
        let err = TrekError::local_persistence("/data/offlineQueue/pendingMemories.json", "disk full");
        let ser = err.to_serializable();
        assert_eq!(ser.kind, "LocalPersistence");
        assert_eq!(
            ser.path,
            Some(PathBuf::from("/data/offlineQueue/pendingMemories.json"))
        );
        assert!(!err.is_remote());
    }
}
