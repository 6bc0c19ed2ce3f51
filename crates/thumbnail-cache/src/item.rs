//! Listed file-system entries and their mutable thumbnail state

use crate::ThumbnailKey;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use photo_metadata::MetadataTarget;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Handle to a materialized thumbnail image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    path: PathBuf,
}

impl Thumbnail {
    /// Materialize a thumbnail from a cache file path
    pub fn load(path: &Path) -> Option<Self> {
        if path.as_os_str().is_empty() {
            return None;
        }
        if !path.is_file() {
            warn!("Thumbnail file vanished before it could be shown: {}", path.display());
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Default)]
struct ThumbnailState {
    thumbnail: Option<Thumbnail>,
    key: Option<ThumbnailKey>,
    generation: u64,
    pixel_width: Option<u32>,
    pixel_height: Option<u32>,
}

/// One row of a folder listing.
///
/// Identity fields are immutable; thumbnail fields change in place while the
/// item is shared with background workers.
#[derive(Debug)]
pub struct ListItem {
    path: PathBuf,
    name: String,
    is_folder: bool,
    last_modified: DateTime<Utc>,
    size_bytes: u64,
    state: Mutex<ThumbnailState>,
}

impl ListItem {
    pub fn folder(path: impl Into<PathBuf>, last_modified: DateTime<Utc>) -> Self {
        Self::new(path.into(), true, last_modified, 0, None)
    }

    pub fn file(
        path: impl Into<PathBuf>,
        last_modified: DateTime<Utc>,
        size_bytes: u64,
        key: Option<ThumbnailKey>,
    ) -> Self {
        Self::new(path.into(), false, last_modified, size_bytes, key)
    }

    fn new(
        path: PathBuf,
        is_folder: bool,
        last_modified: DateTime<Utc>,
        size_bytes: u64,
        key: Option<ThumbnailKey>,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            path,
            name,
            is_folder,
            last_modified,
            size_bytes,
            state: Mutex::new(ThumbnailState {
                key,
                ..Default::default()
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_folder(&self) -> bool {
        self.is_folder
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn thumbnail(&self) -> Option<Thumbnail> {
        self.state.lock().thumbnail.clone()
    }

    pub fn thumbnail_key(&self) -> Option<ThumbnailKey> {
        self.state.lock().key.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn pixel_size(&self) -> Option<(u32, u32)> {
        let state = self.state.lock();
        state.pixel_width.zip(state.pixel_height)
    }

    /// Key and generation to stamp a thumbnail request with, if the item needs one
    pub fn request_ticket(&self) -> Option<(ThumbnailKey, u64)> {
        if self.is_folder {
            return None;
        }
        let state = self.state.lock();
        if state.thumbnail.is_some() {
            return None;
        }
        state.key.clone().map(|key| (key, state.generation))
    }

    /// Point the item at a different cache key. Outstanding requests become stale.
    pub fn reassign_key(&self, key: Option<ThumbnailKey>) {
        let mut state = self.state.lock();
        state.key = key;
        state.generation += 1;
    }

    /// Apply a thumbnail produced for `(key, generation)`.
    ///
    /// Returns `false` and leaves the item untouched when the item has been
    /// re-keyed since the request was issued.
    pub fn update_thumbnail(
        &self,
        thumbnail: Option<Thumbnail>,
        key: &ThumbnailKey,
        generation: u64,
        width: Option<u32>,
        height: Option<u32>,
    ) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation || state.key.as_ref() != Some(key) {
            return false;
        }

        state.thumbnail = thumbnail;
        if width.is_some() && height.is_some() {
            state.pixel_width = width;
            state.pixel_height = height;
        }
        true
    }
}

impl MetadataTarget for ListItem {
    fn file_path(&self) -> &Path {
        &self.path
    }
}
