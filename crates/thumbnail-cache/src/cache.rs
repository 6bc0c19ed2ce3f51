//! Disk-backed thumbnail cache
//!
//! Thumbnails live as `<KEY>.jpg` files in a single cache directory, where the
//! key is derived from the source path and its last-write time. A changed file
//! therefore gets a new cache entry instead of a stale hit.

use crate::generate::{render_thumbnail, GeneratedThumbnail, ThumbnailError, ThumbnailProvider};
use crate::{generate_cache_key, ThumbnailConfig, ThumbnailKey};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

pub struct DiskThumbnailCache {
    cache_dir: PathBuf,
    max_size: u32,
    jpeg_quality: u8,
}

impl DiskThumbnailCache {
    /// Create a cache in the default per-user location
    pub fn new(config: &ThumbnailConfig) -> Result<Self> {
        Self::with_dir(Self::default_cache_dir()?, config)
    }

    /// Create a cache rooted at `cache_dir`
    pub fn with_dir(cache_dir: impl Into<PathBuf>, config: &ThumbnailConfig) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;

        Ok(Self {
            cache_dir,
            max_size: config.max_size,
            jpeg_quality: config.jpeg_quality,
        })
    }

    pub fn default_cache_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir().context("Unable to find local data directory")?;
        Ok(data_dir.join("PhotoGeoExplorer").join("Cache").join("Thumbnails"))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the disk cache path for a key
    pub fn cache_path(&self, key: &ThumbnailKey) -> PathBuf {
        self.cache_dir.join(format!("{}.jpg", key))
    }

    /// Return the cached thumbnail for `file_path`, rendering it on a miss
    pub fn get_or_generate(
        &self,
        file_path: &Path,
        last_write: DateTime<Utc>,
    ) -> Result<GeneratedThumbnail, ThumbnailError> {
        let key = generate_cache_key(file_path, last_write);
        let cache_path = self.cache_path(&key);

        if cache_path.is_file() {
            // Cache hit: dimensions still describe the source image
            let (width, height) = image::image_dimensions(file_path)
                .map_err(|e| ThumbnailError::from_image(file_path, e))?;
            return Ok(GeneratedThumbnail {
                path: cache_path,
                width,
                height,
            });
        }

        let rendered = render_thumbnail(file_path, self.max_size, self.jpeg_quality)?;
        self.store(&cache_path, &rendered.jpeg)?;
        debug!("Cached thumbnail for {} at {}", file_path.display(), cache_path.display());

        Ok(GeneratedThumbnail {
            path: cache_path,
            width: rendered.source_width,
            height: rendered.source_height,
        })
    }

    /// Write through a temp file in the cache directory so readers never see a partial JPEG
    fn store(&self, cache_path: &Path, data: &[u8]) -> Result<(), ThumbnailError> {
        let mut temp = NamedTempFile::new_in(&self.cache_dir)
            .map_err(|e| ThumbnailError::from_io(&self.cache_dir, e))?;
        temp.write_all(data)
            .map_err(|e| ThumbnailError::from_io(temp.path(), e))?;
        temp.persist(cache_path)
            .map_err(|e| ThumbnailError::from_io(cache_path, e.error))?;
        Ok(())
    }

    /// Count cached thumbnails and their size on disk
    pub fn stats(&self) -> Result<CacheStats> {
        let entries: Vec<PathBuf> = fs::read_dir(&self.cache_dir)
            .with_context(|| format!("Failed to read cache directory: {}", self.cache_dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();

        let sizes: Vec<u64> = entries
            .par_iter()
            .filter(|path| path.extension().map_or(false, |ext| ext == "jpg"))
            .filter_map(|path| fs::metadata(path).ok().map(|m| m.len()))
            .collect();

        Ok(CacheStats {
            items: sizes.len(),
            total_bytes: sizes.iter().sum(),
        })
    }

    /// Remove every cached thumbnail
    pub fn clear_all(&self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)
                .with_context(|| format!("Failed to remove cache directory: {}", self.cache_dir.display()))?;
        }
        fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("Failed to recreate cache directory: {}", self.cache_dir.display()))?;
        Ok(())
    }
}

impl ThumbnailProvider for DiskThumbnailCache {
    fn generate(
        &self,
        file_path: &Path,
        last_write: DateTime<Utc>,
    ) -> Result<Option<GeneratedThumbnail>, ThumbnailError> {
        self.get_or_generate(file_path, last_write).map(Some)
    }
}

/// Cache statistics for monitoring and debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub items: usize,
    pub total_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use tempfile::tempdir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> Result<PathBuf> {
        let path = dir.join(name);
        DynamicImage::new_rgb8(width, height).save(&path)?;
        Ok(path)
    }

    #[test]
    fn test_cache_creation() -> Result<()> {
        let temp_dir = tempdir()?;
        let cache_dir = temp_dir.path().join("thumbs");

        let cache = DiskThumbnailCache::with_dir(&cache_dir, &ThumbnailConfig::default())?;

        assert!(cache_dir.exists());
        assert_eq!(cache.stats()?, CacheStats { items: 0, total_bytes: 0 });
        Ok(())
    }

    #[test]
    fn test_cache_paths() -> Result<()> {
        let temp_dir = tempdir()?;
        let cache = DiskThumbnailCache::with_dir(temp_dir.path(), &ThumbnailConfig::default())?;

        let key = generate_cache_key(Path::new("/photos/a.jpg"), Utc::now());
        let path = cache.cache_path(&key);
        assert!(path.starts_with(temp_dir.path()));
        assert!(path.to_string_lossy().ends_with(".jpg"));
        assert!(path.to_string_lossy().contains(key.as_str()));
        Ok(())
    }

    #[test]
    fn test_generate_then_hit() -> Result<()> {
        let temp_dir = tempdir()?;
        let source = write_png(temp_dir.path(), "photo.png", 640, 480)?;
        let cache = DiskThumbnailCache::with_dir(temp_dir.path().join("cache"), &ThumbnailConfig::default())?;
        let modified = Utc::now();

        let first = cache.get_or_generate(&source, modified)?;
        assert!(first.path.exists());
        assert_eq!((first.width, first.height), (640, 480));

        let thumb = image::open(&first.path)?;
        assert_eq!(image::GenericImageView::dimensions(&thumb), (96, 72));

        // Second request is served from disk
        let written = fs::metadata(&first.path)?.modified()?;
        let second = cache.get_or_generate(&source, modified)?;
        assert_eq!(second, first);
        assert_eq!(fs::metadata(&second.path)?.modified()?, written);

        let stats = cache.stats()?;
        assert_eq!(stats.items, 1);
        assert!(stats.total_bytes > 0);
        Ok(())
    }

    #[test]
    fn test_provider_reports_failures() -> Result<()> {
        let temp_dir = tempdir()?;
        let cache = DiskThumbnailCache::with_dir(temp_dir.path(), &ThumbnailConfig::default())?;

        let result = cache.generate(&temp_dir.path().join("missing.jpg"), Utc::now());
        assert!(matches!(result, Err(ThumbnailError::Io { .. })));
        Ok(())
    }

    #[test]
    fn test_hit_with_vanished_source_is_io_error() -> Result<()> {
        let temp_dir = tempdir()?;
        let source = write_png(temp_dir.path(), "photo.png", 64, 64)?;
        let cache = DiskThumbnailCache::with_dir(temp_dir.path().join("cache"), &ThumbnailConfig::default())?;
        let modified = Utc::now();

        cache.get_or_generate(&source, modified)?;
        fs::remove_file(&source)?;

        let result = cache.get_or_generate(&source, modified);
        assert!(matches!(result, Err(ThumbnailError::Io { .. })), "got {:?}", result);
        Ok(())
    }

    #[test]
    fn test_clear_all() -> Result<()> {
        let temp_dir = tempdir()?;
        let source = write_png(temp_dir.path(), "photo.png", 200, 100)?;
        let cache = DiskThumbnailCache::with_dir(temp_dir.path().join("cache"), &ThumbnailConfig::default())?;

        cache.get_or_generate(&source, Utc::now())?;
        assert_eq!(cache.stats()?.items, 1);

        cache.clear_all()?;
        assert!(cache.cache_dir().exists());
        assert_eq!(cache.stats()?.items, 0);
        Ok(())
    }
}
