//! Thumbnail rendering: decode, resize and JPEG-encode a source image
//!
//! Decoding goes through the `image` crate with format sniffing, so the
//! extension of the source file does not need to match its contents.

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageError, ImageReader};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("access denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot decode {}: {source}", .path.display())]
    Unsupported {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("thumbnail worker failed: {0}")]
    Worker(String),
}

impl ThumbnailError {
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            ThumbnailError::PermissionDenied(path.to_path_buf())
        } else {
            ThumbnailError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn from_image(path: &Path, source: ImageError) -> Self {
        match source {
            ImageError::IoError(e) => Self::from_io(path, e),
            other => ThumbnailError::Unsupported {
                path: path.to_path_buf(),
                source: other,
            },
        }
    }
}

/// A thumbnail file on disk plus the pixel size of the image it was made from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedThumbnail {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Produces thumbnails for source files.
///
/// Called from the blocking pool, possibly for several files at once. The
/// result must depend only on `(file_path, last_write)`. `Ok(None)` means the
/// file simply has no thumbnail.
pub trait ThumbnailProvider: Send + Sync + 'static {
    fn generate(
        &self,
        file_path: &Path,
        last_write: DateTime<Utc>,
    ) -> Result<Option<GeneratedThumbnail>, ThumbnailError>;
}

/// Decoded thumbnail ready to be written
pub struct RenderedThumbnail {
    pub jpeg: Vec<u8>,
    pub source_width: u32,
    pub source_height: u32,
}

/// Decode `file_path`, shrink it to fit `max_size` and encode it as JPEG
pub fn render_thumbnail(
    file_path: &Path,
    max_size: u32,
    quality: u8,
) -> Result<RenderedThumbnail, ThumbnailError> {
    let img = decode_image(file_path)?;
    let (source_width, source_height) = img.dimensions();

    let resized = resize_image(img, max_size);
    let jpeg = encode_jpeg(&resized, quality).map_err(|e| ThumbnailError::from_image(file_path, e))?;

    Ok(RenderedThumbnail {
        jpeg,
        source_width,
        source_height,
    })
}

fn decode_image(file_path: &Path) -> Result<DynamicImage, ThumbnailError> {
    ImageReader::open(file_path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| ThumbnailError::from_io(file_path, e))?
        .decode()
        .map_err(|e| ThumbnailError::from_image(file_path, e))
}

/// Resize image to fit within `max_dim` while preserving aspect ratio
fn resize_image(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let max_existing = width.max(height);

    // If image is already smaller than target, don't upscale
    if max_dim == 0 || max_existing <= max_dim {
        return img;
    }

    let ratio = max_dim as f64 / max_existing as f64;
    let new_width = ((width as f64 * ratio).round() as u32).max(1);
    let new_height = ((height as f64 * ratio).round() as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Triangle)
}

/// Encode image as JPEG with specified quality
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_resize_logic() {
        let img = DynamicImage::new_rgb8(1000, 800);

        let resized = resize_image(img.clone(), 96);
        let (w, h) = resized.dimensions();
        assert_eq!(w, 96); // Width should be the limiting dimension
        assert_eq!(h, 77); // Height should maintain aspect ratio

        // Portrait images are limited by height
        let portrait = resize_image(DynamicImage::new_rgb8(300, 600), 96);
        assert_eq!(portrait.dimensions(), (48, 96));

        // Test that small images don't get upscaled
        let small_img = DynamicImage::new_rgb8(64, 40);
        let not_resized = resize_image(small_img.clone(), 96);
        assert_eq!(not_resized.dimensions(), small_img.dimensions());
    }

    #[test]
    fn test_render_reports_source_dimensions() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        let source = temp_dir.path().join("wide.png");
        DynamicImage::new_rgba8(400, 200).save(&source)?;

        let rendered = render_thumbnail(&source, 96, 80)?;
        assert_eq!((rendered.source_width, rendered.source_height), (400, 200));

        let thumb = image::load_from_memory(&rendered.jpeg)?;
        assert_eq!(thumb.dimensions(), (96, 48));
        Ok(())
    }

    #[test]
    fn test_undecodable_file_is_unsupported() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        let source = temp_dir.path().join("broken.jpg");
        fs::write(&source, b"not an image at all")?;

        let err = render_thumbnail(&source, 96, 80).err().unwrap();
        assert!(matches!(err, ThumbnailError::Unsupported { .. }));
        assert!(err.to_string().contains("broken.jpg"));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = render_thumbnail(Path::new("/nonexistent/photogeo/a.jpg"), 96, 80)
            .err()
            .unwrap();
        assert!(matches!(err, ThumbnailError::Io { .. }));
    }
}
