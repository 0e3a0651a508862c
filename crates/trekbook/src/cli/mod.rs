/// Clap argument definitions
mod args;

/// `init` and `config` commands
mod config;

/// `add`, `delete` and `delete-media` commands
mod memory;

/// `queue`, `sync`, `status` and `watch` commands
mod sync;

/// `timeline` and `admin` commands
mod timeline;

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::Parser;
use thiserror::Error;
use tokio::runtime::Runtime;

use trekbook_core::config::Config;
use trekbook_core::connectivity::{ConnectivityMonitor, RemoteReachability};
use trekbook_core::fs::{AsyncFileSystem, RealFileSystem, SyncToAsyncFs};
use trekbook_core::queue::PendingQueue;
use trekbook_core::remote::{FsRemoteStore, RemoteStore};
use trekbook_core::service::{ServiceHandle, ServiceOptions, SyncService};
use trekbook_core::sync::SyncContext;

pub use args::Cli;
use args::Commands;

/// Errors that stop a command before it produces output.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Helper to run async operations in sync context
fn block_on<F: Future>(f: F) -> F::Output {
    futures_lite::future::block_on(f)
}

/// The async filesystem shared by the queue and the remote store.
fn cli_fs() -> Arc<dyn AsyncFileSystem> {
    Arc::new(SyncToAsyncFs::new(RealFileSystem))
}

fn remote_store(config: &Config) -> Arc<FsRemoteStore> {
    Arc::new(FsRemoteStore::new(
        cli_fs(),
        &config.remote_dir,
        &config.bucket,
        config.public_url_base(),
    ))
}

/// A running sync service plus the runtime driving it.
pub struct Session {
    runtime: Runtime,
    handle: ServiceHandle,
}

impl Session {
    /// Start the service.
    ///
    /// The initial connectivity comes from the remote store's availability
    /// unless `force_offline` is set. With `probe` the liveness probe keeps
    /// checking the store; otherwise connectivity stays as detected.
    pub fn open(config: &Config, force_offline: bool, probe: bool) -> Result<Self, CliError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let remote = remote_store(config);
        let online = !force_offline && runtime.block_on(remote.is_available());
        log::debug!(
            "remote store {} is {}",
            config.remote_dir.display(),
            if online { "reachable" } else { "unreachable" }
        );

        let ctx = SyncContext::new(
            PendingQueue::new(cli_fs(), config.queue_path()),
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
            Arc::new(ConnectivityMonitor::new(online)),
        )
        .with_untitled_placeholder(&config.untitled_placeholder);

        let mut options = ServiceOptions::from_config(config);
        if probe && !force_offline {
            options = options.with_reachability(Arc::new(RemoteReachability(remote)));
        }

        let handle = runtime.block_on(async {
            SyncService::new(Arc::new(ctx), options).spawn()
        });
        Ok(Self { runtime, handle })
    }

    /// Handle to the running sync service.
    pub fn handle(&self) -> &ServiceHandle {
        &self.handle
    }

    /// Drive a future on the session's runtime.
    pub fn block_on<F: Future>(&self, f: F) -> F::Output {
        self.runtime.block_on(f)
    }

    /// Stop the service and wait for in-flight work.
    pub fn close(self) {
        let Session { runtime, handle } = self;
        runtime.block_on(handle.shutdown());
    }
}

/// Render a stored UTC timestamp in the user's local time.
pub(crate) fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn load_config() -> Option<Config> {
    match Config::load() {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("✗ Error loading config: {}", e);
            None
        }
    }
}

/// Main entry point for the CLI
pub fn run_cli() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let success = match cli.command {
        Commands::Init {
            data_dir,
            remote_dir,
        } => config::handle_init(data_dir, remote_dir),

        Commands::Config { command } => config::handle_config_command(command),

        command => match load_config() {
            Some(config) => run_with_config(command, &config, cli.offline),
            None => false,
        },
    };

    if !success {
        std::process::exit(1);
    }
}

fn run_with_config(command: Commands, config: &Config, offline: bool) -> bool {
    match command {
        Commands::Add {
            kind,
            day,
            title,
            notes,
            files,
        } => memory::handle_add(config, offline, kind, day, title, notes, &files),

        Commands::Timeline { day } => timeline::handle_timeline(config, offline, day),

        Commands::Admin { json } => timeline::handle_admin(config, offline, json),

        Commands::Queue => sync::handle_queue(config),

        Commands::Sync => sync::handle_sync(config, offline),

        Commands::Delete { id } => memory::handle_delete(config, offline, id),

        Commands::DeleteMedia { id, path } => {
            memory::handle_delete_media(config, offline, id, &path)
        }

        Commands::Status => sync::handle_status(config, offline),

        Commands::Watch => sync::handle_watch(config, offline),

        Commands::Init { .. } | Commands::Config { .. } => true,
    }
}
