//! Bounded-parallel metadata loading for a batch of selected photos

use crate::metadata::PhotoMetadata;
use crate::provider::{MetadataError, MetadataProvider, MetadataTarget};
use futures::future::join_all;
use std::thread;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub const MAX_METADATA_CONCURRENCY: usize = 4;

/// Worker count for a batch of `item_count` files: the CPU count clamped to
/// `1..=MAX_METADATA_CONCURRENCY`, never more than the batch itself.
pub fn metadata_concurrency(item_count: usize) -> usize {
    let cpus = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    cpus.clamp(1, MAX_METADATA_CONCURRENCY).min(item_count)
}

/// Load metadata for every item, pairing each one with its result in input order.
///
/// Failures are logged and reported as `None` for that item only. Once
/// `cancel` fires, items that have not started yet are paired with `None`
/// without touching the provider.
pub async fn load_metadata<P, T>(
    provider: &P,
    items: Vec<T>,
    cancel: &CancellationToken,
) -> Vec<(T, Option<PhotoMetadata>)>
where
    P: MetadataProvider + ?Sized,
    T: MetadataTarget + Send,
{
    if items.is_empty() {
        return Vec::new();
    }

    let concurrency = metadata_concurrency(items.len());
    let limiter = Semaphore::new(concurrency);
    debug!("Loading metadata for {} files with {} workers", items.len(), concurrency);

    let units = items.into_iter().map(|item| {
        let limiter = &limiter;
        async move {
            let Ok(_permit) = limiter.acquire().await else {
                return (item, None);
            };
            if cancel.is_cancelled() {
                return (item, None);
            }

            let path = item.file_path();
            let metadata = match provider.metadata(path, cancel).await {
                Ok(metadata) => metadata,
                Err(MetadataError::Cancelled) => None,
                Err(e) if e.is_transient() => {
                    warn!("Failed to read metadata for {}: {}", path.display(), e);
                    None
                }
                Err(e) => {
                    error!("Unexpected metadata failure for {}: {}", path.display(), e);
                    None
                }
            };

            (item, metadata)
        }
    });

    join_all(units).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct StubProvider {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_on: Option<&'static str>,
        cancel_on_first_call: Option<CancellationToken>,
    }

    #[async_trait]
    impl MetadataProvider for StubProvider {
        async fn metadata(
            &self,
            path: &Path,
            _cancel: &CancellationToken,
        ) -> Result<Option<PhotoMetadata>, MetadataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel_on_first_call {
                token.cancel();
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if Some(name) == self.fail_on {
                return Err(MetadataError::from_io(
                    path,
                    std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
                ));
            }

            Ok(Some(PhotoMetadata {
                camera_model: Some(name.to_string()),
                ..Default::default()
            }))
        }
    }

    fn photo_paths(count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| PathBuf::from(format!("/photos/IMG_{:04}.jpg", i)))
            .collect()
    }

    #[test]
    fn test_concurrency_never_exceeds_batch_or_cap() {
        assert_eq!(metadata_concurrency(0), 0);
        assert_eq!(metadata_concurrency(1), 1);
        assert!(metadata_concurrency(100) >= 1);
        assert!(metadata_concurrency(100) <= MAX_METADATA_CONCURRENCY);
    }

    #[tokio::test]
    async fn test_empty_input_returns_immediately() {
        let provider = StubProvider::default();
        let result = load_metadata(&provider, Vec::<PathBuf>::new(), &CancellationToken::new()).await;

        assert!(result.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_results_pair_with_inputs_in_order() {
        let provider = Arc::new(StubProvider::default());
        let paths = photo_paths(12);

        let result = load_metadata(&provider, paths.clone(), &CancellationToken::new()).await;

        assert_eq!(result.len(), paths.len());
        for ((path, metadata), expected) in result.iter().zip(&paths) {
            assert_eq!(path, expected);
            let name = expected.file_name().unwrap().to_str().unwrap();
            assert_eq!(metadata.as_ref().unwrap().camera_model.as_deref(), Some(name));
        }

        let max = provider.max_in_flight.load(Ordering::SeqCst);
        assert!(max >= 1);
        assert!(max <= metadata_concurrency(paths.len()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_provider() {
        let provider = StubProvider::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = load_metadata(&provider, photo_paths(5), &cancel).await;

        assert_eq!(result.len(), 5);
        assert!(result.iter().all(|(_, metadata)| metadata.is_none()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_stops_remaining_items() {
        let cancel = CancellationToken::new();
        let provider = StubProvider {
            cancel_on_first_call: Some(cancel.clone()),
            ..Default::default()
        };

        let result = load_metadata(&provider, photo_paths(8), &cancel).await;

        assert_eq!(result.len(), 8);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(result[1..].iter().all(|(_, metadata)| metadata.is_none()));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_item_is_logged_and_none() {
        let provider = StubProvider {
            fail_on: Some("IMG_0002.jpg"),
            ..Default::default()
        };

        let result = load_metadata(&provider, photo_paths(4), &CancellationToken::new()).await;

        assert_eq!(result.len(), 4);
        assert!(result[2].1.is_none());
        assert!(result[0].1.is_some());
        assert!(result[1].1.is_some());
        assert!(result[3].1.is_some());
        assert!(logs_contain("IMG_0002.jpg"));
    }
}
