use crate::metadata::PhotoMetadata;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("access denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("invalid EXIF data in {}: {reason}", .path.display())]
    InvalidData { path: PathBuf, reason: String },
    #[error("metadata worker failed: {0}")]
    Worker(String),
    #[error("metadata read cancelled")]
    Cancelled,
}

impl MetadataError {
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            MetadataError::PermissionDenied(path.to_path_buf())
        } else {
            MetadataError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// I/O, permission and worker-state failures that a later retry may not hit
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MetadataError::Io { .. } | MetadataError::PermissionDenied(_) | MetadataError::Worker(_)
        )
    }
}

/// Source of per-file metadata.
///
/// Implementations must tolerate concurrent calls for different paths.
/// `Ok(None)` means the file carries no metadata at all.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn metadata(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<PhotoMetadata>, MetadataError>;
}

#[async_trait]
impl<P: MetadataProvider + ?Sized> MetadataProvider for Arc<P> {
    async fn metadata(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<PhotoMetadata>, MetadataError> {
        (**self).metadata(path, cancel).await
    }
}

/// Anything that can be paired with the metadata of the file it points at
pub trait MetadataTarget {
    fn file_path(&self) -> &Path;
}

impl MetadataTarget for PathBuf {
    fn file_path(&self) -> &Path {
        self
    }
}

impl<T: MetadataTarget + ?Sized> MetadataTarget for Arc<T> {
    fn file_path(&self) -> &Path {
        (**self).file_path()
    }
}

impl<T: MetadataTarget + ?Sized> MetadataTarget for &T {
    fn file_path(&self) -> &Path {
        (**self).file_path()
    }
}
