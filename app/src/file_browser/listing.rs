//! Folder enumeration for the file browser

use crate::file_browser::sort::natural_cmp;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thumbnail_cache::{generate_cache_key, ListItem};
use tracing::{debug, warn};

pub const IMAGE_EXTENSIONS: [&str; 9] = ["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "heic", "webp"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

/// Which entries of a folder make it into the listing.
///
/// Folders are always listed so the user can keep navigating; both filters
/// only apply to files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub images_only: bool,
    pub search_text: Option<String>,
}

impl ListingFilter {
    fn accepts_file(&self, path: &Path, name: &str) -> bool {
        if self.images_only && !is_image_file(path) {
            return false;
        }
        match self.search_text.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => name.to_lowercase().contains(&needle.to_lowercase()),
            _ => true,
        }
    }
}

/// List `folder` on the blocking pool. Entries that cannot be read are skipped.
pub async fn list_folder(folder: &Path, filter: &ListingFilter) -> Result<Vec<Arc<ListItem>>> {
    let folder = folder.to_path_buf();
    let filter = filter.clone();

    tokio::task::spawn_blocking(move || list_folder_blocking(&folder, &filter))
        .await
        .context("Folder listing worker failed")?
}

fn list_folder_blocking(folder: &Path, filter: &ListingFilter) -> Result<Vec<Arc<ListItem>>> {
    if !folder.is_dir() {
        bail!("Not a directory: {}", folder.display());
    }

    let paths: Vec<PathBuf> = fs::read_dir(folder)
        .with_context(|| format!("Failed to read folder: {}", folder.display()))?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", folder.display(), e);
                None
            }
        })
        .collect();

    // Stat calls dominate on network shares, so fan them out
    let items: Vec<Arc<ListItem>> = paths
        .par_iter()
        .filter_map(|path| build_item(path, filter))
        .map(Arc::new)
        .collect();

    debug!("Listed {} of {} entries in {}", items.len(), paths.len(), folder.display());
    Ok(items)
}

fn build_item(path: &Path, filter: &ListingFilter) -> Option<ListItem> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            return None;
        }
    };

    let modified: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    if metadata.is_dir() {
        return Some(ListItem::folder(path, modified));
    }

    let name = path.file_name()?.to_string_lossy();
    if !filter.accepts_file(path, &name) {
        return None;
    }

    let key = is_image_file(path).then(|| generate_cache_key(path, modified));
    Some(ListItem::file(path, modified, metadata.len(), key))
}

/// Immediate subdirectories of `folder`, in natural name order
pub fn child_directories(folder: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(folder) else {
        return Vec::new();
    };

    let mut children: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map_or(false, |t| t.is_dir()))
        .map(|entry| entry.path())
        .collect();

    children.sort_by(|a, b| natural_cmp(&display_name(a), &display_name(b)));
    children
}

/// One step of the path bar, with the sibling folders reachable from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbSegment {
    pub name: String,
    pub path: PathBuf,
    pub children: Vec<PathBuf>,
}

/// Segments from the root down to `folder`
pub fn breadcrumbs(folder: &Path) -> Vec<BreadcrumbSegment> {
    let mut segments: Vec<BreadcrumbSegment> = folder
        .ancestors()
        .map(|path| BreadcrumbSegment {
            name: display_name(path),
            path: path.to_path_buf(),
            children: child_directories(path),
        })
        .collect();
    segments.reverse();
    segments
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
