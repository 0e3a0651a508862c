//! Command-line argument structures and enums

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use trekbook_core::entry::{Category, EntryId, TripDay};
use trekbook_core::sync::DrainPolicy;

#[derive(Parser)]
#[command(name = "trekbook")]
#[command(version)]
#[command(about = "Record trip memories, online or offline", long_about = None)]
pub struct Cli {
    /// Treat the remote store as unreachable for this run
    #[arg(long, global = true)]
    pub offline: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the trekbook configuration
    Init {
        /// Device data directory holding the offline queue
        #[arg(short = 'd', long)]
        data_dir: Option<PathBuf>,

        /// Shared directory acting as the remote store
        #[arg(short, long)]
        remote_dir: Option<PathBuf>,
    },

    /// Add a memory
    #[command(alias = "a")]
    Add {
        /// Memory type: photo, video or diary
        #[arg(short, long, default_value = "photo")]
        kind: Category,

        /// Trip day: "Day 1", "Day 2", "Day 3" or "Travel home"
        #[arg(short, long, default_value = "Day 1")]
        day: TripDay,

        /// Title (defaults to a placeholder when only notes or files are given)
        #[arg(short, long, default_value = "")]
        title: String,

        /// Notes
        #[arg(short, long, default_value = "")]
        notes: String,

        /// Photo or video files to attach
        files: Vec<PathBuf>,
    },

    /// Show memories grouped by trip day
    #[command(alias = "ls")]
    Timeline {
        /// Only show one day
        #[arg(short, long)]
        day: Option<TripDay>,
    },

    /// Show every memory with its media links
    Admin {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List memories waiting in the offline queue
    Queue,

    /// Upload queued memories now
    Sync,

    /// Delete a memory and its media
    Delete {
        /// Memory id
        id: EntryId,
    },

    /// Delete one media item from a memory
    DeleteMedia {
        /// Memory id
        id: EntryId,

        /// Storage path of the media item (see `trekbook admin`)
        path: String,
    },

    /// Show connectivity and queue state
    Status,

    /// Keep syncing in the foreground, printing banners until Ctrl-C
    Watch,

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,

    /// Show or set the drain failure policy
    Policy {
        /// at_least_once or mark_completed
        #[arg(value_parser = parse_policy)]
        policy: Option<DrainPolicy>,
    },

    /// Show or set seconds between connectivity probes
    ProbeInterval {
        /// Seconds
        secs: Option<u64>,
    },

    /// Show or set the remote store directory
    RemoteDir {
        /// Directory path
        path: Option<PathBuf>,
    },
}

pub fn parse_policy(s: &str) -> Result<DrainPolicy, String> {
    match s.trim().to_lowercase().replace('-', "_").as_str() {
        "at_least_once" => Ok(DrainPolicy::AtLeastOnce),
        "mark_completed" => Ok(DrainPolicy::MarkCompleted),
        other => Err(format!(
            "unknown policy '{}', expected at_least_once or mark_completed",
            other
        )),
    }
}
