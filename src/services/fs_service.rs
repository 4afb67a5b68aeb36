use crate::error::{AppError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const MAX_SETTLE_CHECKS: u32 = 50;

/// Regular files directly inside `dir`, sorted by file name. Hidden files
/// and subdirectories are skipped; whether a file decodes as an image is
/// left to the classifier.
pub fn list_regular_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| AppError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let ft = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };

        if !ft.is_file() {
            continue;
        }

        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        files.push(entry.path());
    }

    files.sort();
    Ok(files)
}

/// Picks one file uniformly at random from `dir`. `Ok(None)` when it is empty.
pub fn try_pick_random_file<R: Rng + ?Sized>(dir: &Path, rng: &mut R) -> Result<Option<PathBuf>> {
    Ok(list_regular_files(dir)?.choose(rng).cloned())
}

pub fn is_not_found(err: &AppError) -> bool {
    matches!(err, AppError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
}

/// Like [`try_pick_random_file`], but a missing or unreadable directory is
/// logged and reported as `None`.
pub fn pick_random_file<R: Rng + ?Sized>(dir: &Path, rng: &mut R) -> Option<PathBuf> {
    match try_pick_random_file(dir, rng) {
        Ok(file) => file,
        Err(e) if is_not_found(&e) => {
            warn!("Folder not found: {}", dir.display());
            None
        }
        Err(e) => {
            warn!("Failed to list {}: {}", dir.display(), e);
            None
        }
    }
}

/// Blocks until the file size stops changing between two checks `settle`
/// apart, so a file still being written by the producer is not decoded.
/// A zero `settle` disables the check.
pub fn wait_until_stable(path: &Path, settle: Duration) -> Result<()> {
    if settle.is_zero() {
        return Ok(());
    }

    let size_of = |p: &Path| -> Result<u64> {
        std::fs::metadata(p)
            .map(|m| m.len())
            .map_err(|e| AppError::io(p, e))
    };

    let mut previous = size_of(path)?;
    for _ in 0..MAX_SETTLE_CHECKS {
        std::thread::sleep(settle);
        let current = size_of(path)?;
        if current == previous && current > 0 {
            return Ok(());
        }
        debug!("{} still growing ({} -> {} bytes)", path.display(), previous, current);
        previous = current;
    }

    warn!(
        "{} did not settle after {} checks, using it anyway",
        path.display(),
        MAX_SETTLE_CHECKS
    );
    Ok(())
}
