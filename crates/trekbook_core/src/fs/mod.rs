//! Filesystem abstraction module.
//!
//! This module provides the `FileSystem` trait for abstracting local storage,
//! allowing the offline queue and the filesystem-backed remote store to run
//! against the real disk or entirely in memory.
//!
//! For async operations, see the `AsyncFileSystem` trait and `SyncToAsyncFs` adapter.

mod async_fs;
mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod native;

pub use async_fs::{AsyncFileSystem, BoxFuture, SyncToAsyncFs};

#[cfg(test)]
pub(crate) use async_fs::block_on_test;
pub use memory::InMemoryFileSystem;
#[cfg(not(target_arch = "wasm32"))]
pub use native::RealFileSystem;

use std::io::Result;
use std::path::Path;

/// Abstraction over filesystem operations
/// Allows for different implementations: real filesystem, in-memory (tests, ephemeral runs)
/// Send + Sync required because the sync engine runs on a tokio runtime
pub trait FileSystem: Send + Sync {
    /// Reads the file content as UTF-8
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Creates or overwrites a file
    fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    /// Deletes a file
    fn delete_file(&self, path: &Path) -> Result<()>;

    /// Checks if a file or directory exists
    fn exists(&self, path: &Path) -> bool;

    /// Creates a directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Moves `from` onto `to`, replacing `to` if it exists.
    /// Implementations should make this atomic where the platform allows.
    fn replace_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Reads raw bytes
    fn read_binary(&self, path: &Path) -> Result<Vec<u8>> {
        self.read_to_string(path).map(|s| s.into_bytes())
    }

    /// Writes raw bytes, creating or overwriting the file
    fn write_binary(&self, path: &Path, content: &[u8]) -> Result<()>;
}
