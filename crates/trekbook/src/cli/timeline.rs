//! Timeline and admin listings

use serde::Serialize;

use trekbook_core::config::Config;
use trekbook_core::entry::{Entry, TripDay};
use trekbook_core::entry_set::{AdminSummary, EntrySet};

use crate::cli::{Session, local_time};

/// Fetch the reconciled entry set, or print why it could not be fetched.
fn load_entries(config: &Config, offline: bool) -> Option<EntrySet> {
    let session = match Session::open(config, offline, false) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("✗ {}", e);
            return None;
        }
    };
    if !session.handle().is_online() {
        eprintln!("✗ Offline: memories can't be listed until the remote store is reachable.");
        session.close();
        return None;
    }
    let result = session.block_on(session.handle().refresh());
    let entries = session.handle().entries();
    session.close();

    match result {
        Ok(_) => Some(entries),
        Err(e) => {
            eprintln!("✗ {}", e);
            None
        }
    }
}

fn print_entry(entry: &Entry) {
    println!(
        "  #{:<4} {:<6} {}  ({})",
        entry.id,
        entry.category,
        entry.title,
        local_time(entry.created_at)
    );
    if !entry.notes.is_empty() {
        for line in entry.notes.lines() {
            println!("         {}", line);
        }
    }
    if !entry.media.is_empty() {
        println!("         {} media item(s)", entry.media.len());
    }
}

/// Handle the timeline command
/// Returns true on success, false on error
pub fn handle_timeline(config: &Config, offline: bool, only_day: Option<TripDay>) -> bool {
    let Some(entries) = load_entries(config, offline) else {
        return false;
    };

    if entries.is_empty() {
        println!("No memories yet.");
        return true;
    }

    for (day, group) in entries.by_day() {
        if only_day.is_some_and(|d| d != day) {
            continue;
        }
        println!("{}", day);
        println!("{}", "=".repeat(day.label().len()));
        for entry in group {
            print_entry(entry);
        }
        println!();
    }
    true
}

#[derive(Serialize)]
struct AdminListing<'a> {
    summary: AdminSummary,
    memories: &'a [Entry],
}

/// Handle the admin command
/// Returns true on success, false on error
pub fn handle_admin(config: &Config, offline: bool, json: bool) -> bool {
    let Some(entries) = load_entries(config, offline) else {
        return false;
    };
    let summary = entries.admin_summary();

    if json {
        let listing = AdminListing {
            summary,
            memories: entries.entries(),
        };
        return match serde_json::to_string_pretty(&listing) {
            Ok(out) => {
                println!("{}", out);
                true
            }
            Err(e) => {
                eprintln!("✗ {}", e);
                false
            }
        };
    }

    println!("Trekbook Admin");
    println!("==============");
    println!(
        "Total memories: {} ({} photo, {} video, {} diary), {} media item(s)",
        summary.total, summary.photos, summary.videos, summary.diaries, summary.media_items
    );
    println!();

    for entry in entries.entries() {
        println!(
            "#{}  {}  {}  {}",
            entry.id,
            entry.day,
            entry.category,
            entry.title
        );
        if !entry.notes.is_empty() {
            println!("    notes: {}", entry.notes);
        }
        for media in &entry.media {
            println!("    [{}] {} -> {}", media.path, media.name, media.url);
        }
    }
    true
}
