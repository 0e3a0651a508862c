//! Config command handlers

use std::path::PathBuf;

use trekbook_core::config::Config;

use crate::cli::args::ConfigCommands;

/// Handle the init command
/// Returns true on success, false on error
pub fn handle_init(data_dir: Option<PathBuf>, remote_dir: Option<PathBuf>) -> bool {
    match Config::init(data_dir, remote_dir) {
        Ok(config) => {
            println!("✓ Initialized trekbook configuration");
            println!("  Data directory: {}", config.data_dir.display());
            println!("  Remote store:   {}", config.remote_dir.display());
            if let Some(path) = Config::config_path() {
                println!("  Config file:    {}", path.display());
            }
            if !config.remote_dir.exists() {
                println!();
                println!(
                    "The remote store directory does not exist yet. Memories will be queued until it does."
                );
            }
            true
        }
        Err(e) => {
            eprintln!("✗ Error initializing config: {}", e);
            false
        }
    }
}

pub fn handle_config_command(command: Option<ConfigCommands>) -> bool {
    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Error loading config: {}", e);
            return false;
        }
    };

    match command {
        None | Some(ConfigCommands::Show) => {
            show_config(&config);
            true
        }
        Some(ConfigCommands::Policy { policy }) => match policy {
            Some(policy) => {
                config.drain_policy = policy;
                save(&config, "Drain policy", format!("{:?}", policy))
            }
            None => {
                println!("{:?}", config.drain_policy);
                true
            }
        },
        Some(ConfigCommands::ProbeInterval { secs }) => match secs {
            Some(secs) => {
                config.probe_interval_secs = secs;
                save(
                    &config,
                    "Probe interval",
                    format!("{}s", config.probe_interval().as_secs()),
                )
            }
            None => {
                println!("{}", config.probe_interval().as_secs());
                true
            }
        },
        Some(ConfigCommands::RemoteDir { path }) => match path {
            Some(path) => {
                config.remote_dir = path;
                let shown = config.remote_dir.display().to_string();
                save(&config, "Remote store", shown)
            }
            None => {
                println!("{}", config.remote_dir.display());
                true
            }
        },
    }
}

fn save(config: &Config, what: &str, value: String) -> bool {
    match config.save() {
        Ok(()) => {
            println!("✓ {} set to {}", what, value);
            true
        }
        Err(e) => {
            eprintln!("✗ Error saving config: {}", e);
            false
        }
    }
}

/// Show trekbook configuration
fn show_config(config: &Config) {
    println!("Trekbook Configuration");
    println!("======================");
    println!("Data directory: {}", config.data_dir.display());
    println!("Queue slot: {}", config.queue_path().display());
    println!("Remote store: {}", config.remote_dir.display());
    println!("Bucket: {}", config.bucket);
    println!("Public URL base: {}", config.public_url_base());
    println!("Probe interval: {}s", config.probe_interval().as_secs());
    println!("Drain policy: {:?}", config.drain_policy);
    println!("Untitled placeholder: {}", config.untitled_placeholder);
    if let Some(config_path) = Config::config_path() {
        println!("Config file: {}", config_path.display());
    }
}
