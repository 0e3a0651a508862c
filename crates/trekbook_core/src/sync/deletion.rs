//! Entry and media deletion.
//!
//! Both operations change remote state and patch the reconciled entry set to
//! match, so the view never shows something the remote store no longer has.

use super::SyncContext;
use crate::entry::{Entry, EntryId};
use crate::error::{Result, TrekError};

/// Remove one media item from an entry.
///
/// Deletes the object, drops its reference from the entry set and writes the
/// remaining media list to the remote record. If that last write fails the
/// error is returned and the entry set keeps the new list; the next refresh
/// reconciles the two.
pub async fn delete_media(ctx: &SyncContext, id: EntryId, path: &str) -> Result<()> {
    match ctx.entries().get(id) {
        None => return Err(TrekError::EntryNotFound(id)),
        Some(entry) if entry.media_at(path).is_none() => {
            return Err(TrekError::MediaNotFound {
                id,
                path: path.to_string(),
            });
        }
        Some(_) => {}
    }

    ctx.remote()
        .delete_objects(vec![path.to_string()])
        .await
        .map_err(|e| TrekError::remote_write("delete_objects", e))?;

    let remaining = ctx
        .update_entries(|set| set.remove_media(id, path))
        .ok_or(TrekError::EntryNotFound(id))?;

    ctx.remote()
        .update_entry_media(id, remaining)
        .await
        .map_err(|e| {
            log::warn!("media list of memory {} is out of sync: {}", id, e);
            TrekError::remote_write("update_entry_media", e)
        })?;

    log::info!("deleted media {} from memory {}", path, id);
    Ok(())
}

/// Delete an entry together with its media.
///
/// Media removal is best effort: a failed batch delete is logged and the
/// record is deleted anyway. A failed record delete is returned and the entry
/// stays in the set.
pub async fn delete_entry(ctx: &SyncContext, entry: &Entry) -> Result<()> {
    let paths = entry.media_paths();
    if !paths.is_empty() {
        let count = paths.len();
        if let Err(e) = ctx.remote().delete_objects(paths).await {
            log::warn!(
                "could not delete {} media object(s) of memory {}: {}",
                count,
                entry.id,
                e
            );
        }
    }

    ctx.remote()
        .delete_entry(entry.id)
        .await
        .map_err(|e| TrekError::remote_write("delete_entry", e))?;

    ctx.update_entries(|set| set.remove(entry.id));
    log::info!("deleted memory {}", entry.id);
    Ok(())
}
