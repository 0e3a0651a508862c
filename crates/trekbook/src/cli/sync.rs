//! Queue, sync, status and watch command handlers

use trekbook_core::config::Config;
use trekbook_core::queue::PendingQueue;
use trekbook_core::status::{BannerKind, Status};
use trekbook_core::sync::DrainOutcome;

use crate::cli::{Session, block_on, cli_fs, local_time};

fn open_queue(config: &Config) -> PendingQueue {
    PendingQueue::new(cli_fs(), config.queue_path())
}

/// Handle the queue command
/// Returns true on success, false on error
pub fn handle_queue(config: &Config) -> bool {
    let records = match block_on(open_queue(config).load()) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    if records.is_empty() {
        println!("No memories waiting to upload.");
        return true;
    }

    println!("{} memories waiting to upload:", records.len());
    for record in &records {
        let draft = &record.draft;
        let title = if draft.title.trim().is_empty() {
            "(no title)"
        } else {
            draft.title.as_str()
        };
        println!(
            "  {}  {}  {:<6} {:<12} {}  [{} file(s)]",
            local_time(record.enqueued_at),
            record.queue_id,
            draft.category,
            draft.day,
            title,
            draft.files.len()
        );
    }
    true
}

/// Handle the sync command
/// Returns true on success, false on error
pub fn handle_sync(config: &Config, offline: bool) -> bool {
    let session = match Session::open(config, offline, false) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };
    let result = session.block_on(session.handle().sync_now());
    let banner = session.handle().status().message();
    session.close();

    match result {
        Ok(DrainOutcome::Drained { uploaded, refreshed }) => {
            println!("✓ {} ({} uploaded)", banner, uploaded);
            if !refreshed {
                println!("  (memory list could not be refreshed)");
            }
            true
        }
        Ok(DrainOutcome::Empty) => {
            println!("✓ Nothing to upload.");
            true
        }
        Ok(DrainOutcome::AlreadyRunning) => {
            println!("A sync is already in progress.");
            true
        }
        Ok(DrainOutcome::Offline) => {
            eprintln!("✗ {}", Status::Offline.message());
            false
        }
        Err(e) => {
            eprintln!("✗ {}", banner_or(&banner, &e.to_string()));
            false
        }
    }
}

fn banner_or<'a>(banner: &'a str, fallback: &'a str) -> &'a str {
    if banner.is_empty() { fallback } else { banner }
}

/// Handle the status command
/// Returns true on success, false on error
pub fn handle_status(config: &Config, offline: bool) -> bool {
    let pending = match block_on(open_queue(config).len()) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };
    let session = match Session::open(config, offline, false) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };
    let online = session.handle().is_online();
    session.close();

    println!("Trekbook Status");
    println!("===============");
    println!("Connectivity: {}", if online { "online" } else { "offline" });
    println!("Remote store: {}", config.remote_dir.display());
    println!("Queue: {} ({} pending)", config.queue_path().display(), pending);
    println!("Drain policy: {:?}", config.drain_policy);
    true
}

fn print_banner(status: &Status) {
    match status.kind() {
        Some(BannerKind::Error) => eprintln!("✗ {}", status.message()),
        Some(BannerKind::Success) => println!("✓ {}", status.message()),
        Some(BannerKind::Info) => println!("… {}", status.message()),
        None => {}
    }
}

/// Handle the watch command
/// Returns true on success, false on error
pub fn handle_watch(config: &Config, offline: bool) -> bool {
    let session = match Session::open(config, offline, true) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    println!(
        "Watching {} (probe every {}s). Press Ctrl-C to stop.",
        config.remote_dir.display(),
        config.probe_interval().as_secs()
    );
    println!(
        "Currently {}.",
        if session.handle().is_online() { "online" } else { "offline" }
    );

    let mut status = session.handle().subscribe_status();
    let result = session.block_on(async {
        // Anything queued from earlier runs goes up right away
        if session.handle().is_online() {
            let _ = session.handle().sync_now().await;
        }
        loop {
            tokio::select! {
                changed = status.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let current = status.borrow_and_update().clone();
                    print_banner(&current);
                }
                signal = tokio::signal::ctrl_c() => {
                    break signal;
                }
            }
        }
    });
    session.close();

    match result {
        Ok(()) => {
            println!();
            println!("Stopped watching.");
            true
        }
        Err(e) => {
            eprintln!("✗ Failed to listen for Ctrl-C: {}", e);
            false
        }
    }
}
