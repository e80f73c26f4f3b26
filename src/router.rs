// src/router.rs - Filesystem moves behind classification and undo

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::errors::{ClassifyError, Result};

/// What happened when a photo was routed to a destination directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The photo now lives at `to`
    Moved { from: PathBuf, to: PathBuf },
    /// A file with the same name was already at the destination; nothing moved
    Skipped { photo: PathBuf, existing: PathBuf },
}

/// Move `photo` into `dest_dir`, creating the directory on demand.
///
/// Never overwrites: a name collision yields `MoveOutcome::Skipped` and leaves
/// both files untouched.
pub fn move_photo(photo: &Path, dest_dir: &Path) -> Result<MoveOutcome> {
    let file_name = photo
        .file_name()
        .ok_or_else(|| ClassifyError::InvalidPath(photo.to_path_buf()))?;
    let target = dest_dir.join(file_name);

    fs::create_dir_all(dest_dir).map_err(|e| ClassifyError::MoveFailed {
        from: photo.to_path_buf(),
        to: target.clone(),
        source: e,
    })?;

    if target.exists() {
        log::warn!(
            "Skipped {}: {} already exists",
            photo.display(),
            target.display()
        );
        return Ok(MoveOutcome::Skipped {
            photo: photo.to_path_buf(),
            existing: target,
        });
    }

    relocate(photo, &target)?;
    log::info!("Moved {} -> {}", photo.display(), target.display());

    Ok(MoveOutcome::Moved {
        from: photo.to_path_buf(),
        to: target,
    })
}

/// Put a classified photo back at its original path
pub fn move_back(destination: &Path, original: &Path) -> Result<()> {
    if original.exists() {
        return Err(ClassifyError::MoveFailed {
            from: destination.to_path_buf(),
            to: original.to_path_buf(),
            source: io::Error::new(ErrorKind::AlreadyExists, "original path is occupied"),
        });
    }

    relocate(destination, original)?;
    log::info!("Restored {} -> {}", destination.display(), original.display());
    Ok(())
}

/// Rename, falling back to copy + remove when the rename crosses devices
fn relocate(from: &Path, to: &Path) -> Result<()> {
    let failed = |source: io::Error| ClassifyError::MoveFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let rename_err = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    if !from.is_file() {
        return Err(failed(rename_err));
    }

    log::debug!("rename failed ({}), copying {} instead", rename_err, from.display());
    fs::copy(from, to).map_err(failed)?;
    if let Err(e) = fs::remove_file(from) {
        // Source is locked; drop the copy so the photo exists in one place only
        let _ = fs::remove_file(to);
        return Err(failed(e));
    }

    Ok(())
}
