//! Thumbnail caching and background generation pipeline for PhotoGeo
//!
//! This crate turns a folder listing into small grid thumbnails without ever
//! blocking the caller: a disk-backed cache produces JPEG thumbnails, and a
//! per-pane scheduler fans generation out over a bounded pool, collects the
//! results off-thread and applies them to the listed items in periodic
//! batches.
//!
//! # Features
//!
//! - **Disk cache**: thumbnails keyed by path and last-write time, written atomically
//! - **Bounded generation**: a fixed number of provider calls in flight per pane
//! - **Deduplication**: one request per cache key at a time
//! - **Batched application**: results applied on a flush interval, not one by one
//! - **Generation fence**: results for a re-keyed item are dropped, never misapplied

pub mod cache;
pub mod collector;
pub mod generate;
pub mod item;
pub mod scheduler;

pub use cache::{CacheStats, DiskThumbnailCache};
pub use generate::{GeneratedThumbnail, ThumbnailError, ThumbnailProvider};
pub use item::{ListItem, Thumbnail};
pub use scheduler::{RoundProgress, ThumbnailEvent, ThumbnailScheduler};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Standard configuration for thumbnail generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThumbnailConfig {
    /// Long edge of a generated thumbnail in pixels
    pub max_size: u32,
    pub jpeg_quality: u8,
    /// Provider calls allowed in flight per scheduler
    pub concurrency: usize,
    pub flush_interval_ms: u64,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_size: 96,
            jpeg_quality: 80,
            concurrency: 3,
            flush_interval_ms: 300,
        }
    }
}

impl ThumbnailConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }
}

/// Identity of a thumbnail in the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThumbnailKey(String);

impl ThumbnailKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThumbnailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a cache key for a file based on its path and modification time
pub fn generate_cache_key(file_path: &Path, last_write: DateTime<Utc>) -> ThumbnailKey {
    use sha2::{Digest, Sha256};

    let source = format!("{}|{}", file_path.to_string_lossy(), last_write.timestamp_micros());

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    ThumbnailKey(hex::encode_upper(hasher.finalize()))
}
