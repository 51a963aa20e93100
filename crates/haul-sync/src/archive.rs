//! Zip extraction with validate-then-unpack semantics.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Result, SyncError};

/// Unpack `bytes`, a zip archive, into `dest`.
///
/// `dest` must be absent or empty. Every entry name is validated before
/// anything is written: a name that would resolve outside `dest` (absolute,
/// or containing `..`) fails the whole call with
/// [`SyncError::UnsafeArchiveEntry`] and leaves `dest` unmodified.
pub fn extract(bytes: &[u8], dest: &Path) -> Result<()> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| SyncError::CorruptArchive(e.to_string()))?;

    // First pass: every entry must map to a path inside dest.
    let mut entry_paths = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| SyncError::CorruptArchive(e.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(SyncError::UnsafeArchiveEntry(entry.name().to_string()));
        };
        entry_paths.push(relative);
    }

    fs::create_dir_all(dest).map_err(|e| SyncError::filesystem(dest, e))?;
    ensure_empty(dest)?;

    for (index, relative) in entry_paths.iter().enumerate() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| SyncError::CorruptArchive(e.to_string()))?;
        let out = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| SyncError::filesystem(&out, e))?;
            continue;
        }

        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::filesystem(parent, e))?;
        }

        // Decompress fully before touching disk so a broken stream reports
        // as a corrupt archive instead of a filesystem error.
        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents).map_err(|e| {
            SyncError::CorruptArchive(format!("entry {}: {e}", relative.display()))
        })?;
        fs::write(&out, &contents).map_err(|e| SyncError::filesystem(&out, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out, fs::Permissions::from_mode(mode))
                    .map_err(|e| SyncError::filesystem(&out, e))?;
            }
        }
    }

    log::debug!("extracted {} entries into {}", entry_paths.len(), dest.display());
    Ok(())
}

fn ensure_empty(dir: &Path) -> Result<()> {
    let mut entries = fs::read_dir(dir).map_err(|e| SyncError::filesystem(dir, e))?;
    if entries.next().is_some() {
        return Err(SyncError::filesystem(
            dir,
            io::Error::other("extraction directory is not empty"),
        ));
    }
    Ok(())
}
