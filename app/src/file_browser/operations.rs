//! Create, rename, move and delete entries of the browsed folder
//!
//! Everything here is blocking file system work; the pane runs it through
//! [`run_blocking`] and reloads the listing afterwards.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Characters no file name may contain on any platform the app runs on
const INVALID_NAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub fn is_valid_file_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.chars().any(|c| c.is_control() || INVALID_NAME_CHARS.contains(&c))
}

/// Trim the new name and keep the original extension when a file is renamed without one
pub fn normalize_rename(original_name: &str, is_folder: bool, new_name: &str) -> String {
    let trimmed = new_name.trim();
    if is_folder {
        return trimmed.to_string();
    }

    let original_ext = Path::new(original_name).extension().and_then(|e| e.to_str());
    let new_ext = Path::new(trimmed).extension();
    match (original_ext, new_ext) {
        (Some(ext), None) if !ext.is_empty() => format!("{}.{}", trimmed, ext),
        _ => trimmed.to_string(),
    }
}

fn ensure_free(target: &Path) -> Result<()> {
    if target.exists() {
        bail!("{} already exists", target.display());
    }
    Ok(())
}

/// Create `name` inside `parent` and return its path
pub fn create_folder(parent: &Path, name: &str) -> Result<PathBuf> {
    let name = name.trim();
    if !is_valid_file_name(name) {
        bail!("Invalid folder name: {:?}", name);
    }
    let target = parent.join(name);
    ensure_free(&target)?;

    fs::create_dir(&target).with_context(|| format!("Failed to create folder: {}", target.display()))?;
    info!("Created folder {}", target.display());
    Ok(target)
}

/// Rename `path` in place. `Ok(None)` when the name does not actually change.
pub fn rename_item(path: &Path, is_folder: bool, new_name: &str) -> Result<Option<PathBuf>> {
    let (Some(parent), Some(current)) = (path.parent(), path.file_name().and_then(|n| n.to_str())) else {
        bail!("Cannot rename {}", path.display());
    };

    let name = normalize_rename(current, is_folder, new_name);
    if name.is_empty() || name.eq_ignore_ascii_case(current) {
        return Ok(None);
    }
    if !is_valid_file_name(&name) {
        bail!("Invalid name: {:?}", name);
    }
    let target = parent.join(&name);
    ensure_free(&target)?;

    fs::rename(path, &target)
        .with_context(|| format!("Failed to rename {} to {}", path.display(), name))?;
    info!("Renamed {} to {}", path.display(), target.display());
    Ok(Some(target))
}

/// Move `paths` into `destination`. Entries already there are left alone.
///
/// Stops at the first failure; entries moved before it stay moved.
pub fn move_items(paths: &[PathBuf], destination: &Path) -> Result<usize> {
    let mut moved = 0;
    for path in paths {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            continue;
        };
        if same_path(parent, destination) {
            continue;
        }
        if path.is_dir() && is_within(path, destination) {
            bail!("Cannot move {} into itself", path.display());
        }

        let target = destination.join(name);
        ensure_free(&target)?;
        fs::rename(path, &target)
            .with_context(|| format!("Failed to move {} to {}", path.display(), destination.display()))?;
        moved += 1;
    }
    info!("Moved {} items to {}", moved, destination.display());
    Ok(moved)
}

/// Delete files and whole folder trees. A file system root is never deleted.
pub fn delete_items(paths: &[PathBuf]) -> Result<usize> {
    let mut deleted = 0;
    for path in paths {
        if path.is_dir() {
            if path.parent().is_none() {
                bail!("Refusing to delete {}", path.display());
            }
            fs::remove_dir_all(path).with_context(|| format!("Failed to delete folder: {}", path.display()))?;
        } else {
            fs::remove_file(path).with_context(|| format!("Failed to delete file: {}", path.display()))?;
        }
        deleted += 1;
    }
    info!("Deleted {} items", deleted);
    Ok(deleted)
}

fn comparable(path: &Path) -> String {
    super::normalize_path(path).to_string_lossy().to_lowercase()
}

fn same_path(a: &Path, b: &Path) -> bool {
    comparable(a) == comparable(b)
}

/// Whether `candidate` is `root` or lies below it
fn is_within(root: &Path, candidate: &Path) -> bool {
    super::normalize_path(candidate)
        .ancestors()
        .any(|ancestor| comparable(ancestor) == comparable(root))
}

pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("File operation worker failed")?
}
