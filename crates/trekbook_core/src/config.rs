//! Configuration types for Trekbook.
//!
//! This module provides the [`Config`] struct which stores device-local settings.
//! Configuration is persisted as TOML (typically at
//! `~/.config/trekbook/config.toml` on Unix systems).
//!
//! # Key Configuration Fields
//!
//! - `data_dir`: Where the offline queue lives on this device
//! - `queue_slot`: Name of the queue slot inside `data_dir/offlineQueue`
//! - `remote_dir` / `public_base_url` / `bucket`: Filesystem-backed remote store
//! - `probe_interval_secs`: Cadence of the periodic liveness probe
//! - `drain_policy`: How a failed drain treats already-inserted records
//!
//! # Example
//!
//! ```ignore
//! use trekbook_core::config::Config;
//!
//! let config = Config::load()?;
//! let slot = config.queue_path();
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entry::UNTITLED_PLACEHOLDER;
use crate::error::{Result, TrekError};
use crate::fs::AsyncFileSystem;
use crate::sync::DrainPolicy;

/// Queue slot name used by the original web client.
pub const DEFAULT_QUEUE_SLOT: &str = "pendingMemories";

/// Object store bucket holding uploaded media.
pub const DEFAULT_BUCKET: &str = "trip-media";

/// Seconds between liveness probes.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 10;

/// `Config` represents the parts of Trekbook that the user can configure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Device-local data directory. The offline queue is stored below it.
    pub data_dir: PathBuf,

    /// Name of the queue slot (file stem inside `data_dir/offlineQueue`).
    #[serde(default = "default_queue_slot")]
    pub queue_slot: String,

    /// Root directory of the filesystem-backed remote store.
    pub remote_dir: PathBuf,

    /// Base URL prefixed to storage paths when issuing public media URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,

    /// Object store bucket for media.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Seconds between liveness probes.
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Behavior of a drain that fails part-way through the batch.
    #[serde(default)]
    pub drain_policy: DrainPolicy,

    /// Title given to memories submitted without one.
    #[serde(default = "default_untitled")]
    pub untitled_placeholder: String,
}

fn default_queue_slot() -> String {
    DEFAULT_QUEUE_SLOT.to_string()
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_probe_interval() -> u64 {
    DEFAULT_PROBE_INTERVAL_SECS
}

fn default_untitled() -> String {
    UNTITLED_PLACEHOLDER.to_string()
}

impl Config {
    /// Create a config rooted at `data_dir`, with the remote store in `remote_dir`.
    pub fn new(data_dir: PathBuf, remote_dir: PathBuf) -> Self {
        Self {
            data_dir,
            queue_slot: default_queue_slot(),
            remote_dir,
            public_base_url: None,
            bucket: default_bucket(),
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            drain_policy: DrainPolicy::default(),
            untitled_placeholder: default_untitled(),
        }
    }

    /// Path of the offline queue slot file.
    pub fn queue_path(&self) -> PathBuf {
        self.data_dir
            .join("offlineQueue")
            .join(format!("{}.json", self.queue_slot))
    }

    /// Probe cadence as a [`Duration`]. Zero is clamped to one second.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    /// Base URL used for public media links.
    ///
    /// Falls back to a `file://` URL into the bucket directory.
    pub fn public_url_base(&self) -> String {
        match &self.public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!(
                "file://{}",
                self.remote_dir.join(&self.bucket).to_string_lossy()
            ),
        }
    }

    // ========================================================================
    // AsyncFileSystem-based methods
    // ========================================================================

    /// Load config from a specific path using an AsyncFileSystem.
    pub async fn load_from<FS: AsyncFileSystem + ?Sized>(fs: &FS, path: &Path) -> Result<Self> {
        let contents = fs.read_to_string(path).await?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path using an AsyncFileSystem.
    pub async fn save_to<FS: AsyncFileSystem + ?Sized>(&self, fs: &FS, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs.create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs.write_file(path, &contents).await?;
        Ok(())
    }
}

// ============================================================================
// Native-only implementation
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trekbook");
        let remote_dir = data_dir.join("remote");
        Self::new(data_dir, remote_dir)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Config {
    /// Get the config file path (~/.config/trekbook/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("trekbook").join("config.toml"))
    }

    /// Load config from default location, or return default if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let contents = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            return Ok(config);
        }

        Ok(Config::default())
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(TrekError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        Ok(())
    }

    /// Initialize and persist a config with the given directories
    pub fn init(data_dir: Option<PathBuf>, remote_dir: Option<PathBuf>) -> Result<Self> {
        let defaults = Config::default();
        let data_dir = data_dir.unwrap_or(defaults.data_dir);
        let remote_dir = remote_dir.unwrap_or_else(|| data_dir.join("remote"));
        let config = Config::new(data_dir, remote_dir);
        config.save()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{InMemoryFileSystem, SyncToAsyncFs, block_on_test};

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            data_dir = "/var/trek"
            remote_dir = "/mnt/share"
            "#,
        )
        .unwrap();

        assert_eq!(config.queue_slot, "pendingMemories");
        assert_eq!(config.bucket, "trip-media");
        assert_eq!(config.probe_interval(), Duration::from_secs(10));
        assert_eq!(config.drain_policy, DrainPolicy::AtLeastOnce);
        assert_eq!(config.untitled_placeholder, "(Untitled memory)");
        assert_eq!(
            config.queue_path(),
            PathBuf::from("/var/trek/offlineQueue/pendingMemories.json")
        );
    }

    #[test]
    fn test_save_and_load_through_fs() {
        let fs = SyncToAsyncFs::new(InMemoryFileSystem::new());
        let mut config = Config::new("/data".into(), "/remote".into());
        config.drain_policy = DrainPolicy::MarkCompleted;
        config.public_base_url = Some("https://cdn.example/trip-media/".into());

        block_on_test(async {
            config
                .save_to(&fs, Path::new("/etc/trekbook/config.toml"))
                .await
                .unwrap();
            let loaded = Config::load_from(&fs, Path::new("/etc/trekbook/config.toml"))
                .await
                .unwrap();
            assert_eq!(loaded, config);
            assert_eq!(loaded.public_url_base(), "https://cdn.example/trip-media");
        });
    }

    #[test]
    fn test_zero_probe_interval_is_clamped() {
        let mut config = Config::new("/d".into(), "/r".into());
        config.probe_interval_secs = 0;
        assert_eq!(config.probe_interval(), Duration::from_secs(1));
    }
}
