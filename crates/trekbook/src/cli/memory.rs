//! Memory command handlers

use std::path::PathBuf;

use trekbook_core::config::Config;
use trekbook_core::entry::{Category, EntryDraft, EntryId, LocalFile, TripDay};
use trekbook_core::error::Result;
use trekbook_core::fs::AsyncFileSystem;
use trekbook_core::sync::Submission;

use crate::cli::{Session, block_on, cli_fs};

/// Read attachments and assemble a draft.
pub fn build_draft(
    fs: &dyn AsyncFileSystem,
    kind: Category,
    day: TripDay,
    title: String,
    notes: String,
    files: &[PathBuf],
) -> Result<EntryDraft> {
    let mut draft = EntryDraft::new(kind, day).with_title(title).with_notes(notes);
    for path in files {
        let file = block_on(LocalFile::read_from(fs, path))?;
        draft = draft.with_file(file);
    }
    Ok(draft)
}

/// Handle the add command
/// Returns true on success, false on error
pub fn handle_add(
    config: &Config,
    offline: bool,
    kind: Category,
    day: TripDay,
    title: String,
    notes: String,
    files: &[PathBuf],
) -> bool {
    let fs = cli_fs();
    let draft = match build_draft(fs.as_ref(), kind, day, title, notes, files) {
        Ok(draft) => draft,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };
    if let Err(e) = draft.validate() {
        eprintln!("✗ {}", e);
        return false;
    }

    let session = match Session::open(config, offline, false) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    let result = session.block_on(session.handle().submit(draft));
    let banner = session.handle().status().message();
    session.close();

    match result {
        Ok(Submission::Saved(entry)) => {
            println!("✓ {} (#{}: {})", banner, entry.id, entry.title);
            for media in &entry.media {
                println!("  {}", media.url);
            }
            true
        }
        Ok(Submission::Queued(record)) => {
            println!("✓ {}", banner);
            println!("  queued as {}", record.queue_id);
            true
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            false
        }
    }
}

/// Handle the delete command
/// Returns true on success, false on error
pub fn handle_delete(config: &Config, offline: bool, id: EntryId) -> bool {
    with_loaded_session(config, offline, |session| {
        session.block_on(session.handle().delete_entry(id))?;
        println!("✓ Deleted memory #{}", id);
        Ok(())
    })
}

/// Handle the delete-media command
/// Returns true on success, false on error
pub fn handle_delete_media(config: &Config, offline: bool, id: EntryId, path: &str) -> bool {
    with_loaded_session(config, offline, |session| {
        session.block_on(session.handle().delete_media(id, path))?;
        println!("✓ Deleted {} from memory #{}", path, id);
        Ok(())
    })
}

/// Open a session, load the entry set and run `f`.
fn with_loaded_session(
    config: &Config,
    offline: bool,
    f: impl FnOnce(&Session) -> Result<()>,
) -> bool {
    let session = match Session::open(config, offline, false) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };
    let result = session
        .block_on(session.handle().refresh())
        .and_then(|_| f(&session));
    session.close();

    match result {
        Ok(()) => true,
        Err(e) => {
            eprintln!("✗ {}", e);
            false
        }
    }
}
