use crate::preview::zoom::ZoomState;
use parking_lot::Mutex;
use photo_metadata::{MetadataProvider, PhotoMetadata};
use std::path::PathBuf;
use std::sync::Arc;
use thumbnail_cache::ListItem;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewUpdate {
    /// Nothing is selected; the preview is empty
    Cleared,
    /// The selection starts with a folder or the photo already on show
    Unchanged,
    Shown {
        path: PathBuf,
        summary: Option<String>,
    },
    /// A newer selection arrived while this one was loading
    Superseded,
}

#[derive(Default)]
struct PreviewState {
    current: Option<Arc<ListItem>>,
    summary: Option<String>,
    zoom: ZoomState,
}

/// Headless preview: the first selected photo, its one-line summary and zoom state
pub struct PreviewPane<M: MetadataProvider> {
    provider: Arc<M>,
    state: Mutex<PreviewState>,
    active_load: Mutex<Option<CancellationToken>>,
}

impl<M: MetadataProvider> PreviewPane<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self {
            provider,
            state: Mutex::new(PreviewState::default()),
            active_load: Mutex::new(None),
        }
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.state.lock().current.as_ref().map(|item| item.path().to_path_buf())
    }

    pub fn summary(&self) -> Option<String> {
        self.state.lock().summary.clone()
    }

    pub fn zoom_state(&self) -> ZoomState {
        self.state.lock().zoom.clone()
    }

    /// Run a zoom operation (viewport change, zoom in/out, fit, ...) against the preview
    pub fn update_zoom<R>(&self, f: impl FnOnce(&mut ZoomState) -> R) -> R {
        f(&mut self.state.lock().zoom)
    }

    /// Show the first selected photo
    pub async fn show_selection(&self, selected: &[Arc<ListItem>]) -> PreviewUpdate {
        let token = CancellationToken::new();
        if let Some(previous) = self.active_load.lock().replace(token.clone()) {
            previous.cancel();
        }

        let Some(first) = selected.first() else {
            let mut state = self.state.lock();
            state.current = None;
            state.summary = None;
            state.zoom.image_closed();
            return PreviewUpdate::Cleared;
        };
        if first.is_folder() {
            return PreviewUpdate::Unchanged;
        }
        {
            let mut state = self.state.lock();
            if state.current.as_ref().map(|item| item.path()) == Some(first.path()) {
                return PreviewUpdate::Unchanged;
            }
            state.current = Some(Arc::clone(first));
        }

        let metadata = match self.provider.metadata(first.path(), &token).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Failed to read metadata for {}: {}", first.path().display(), e);
                None
            }
        };
        if token.is_cancelled() {
            debug!("Discarding preview of {}", first.path().display());
            return PreviewUpdate::Superseded;
        }

        let size = first.pixel_size().or_else(|| {
            metadata
                .as_ref()
                .and_then(|m| m.pixel_width.zip(m.pixel_height))
        });
        let summary = metadata_summary(metadata.as_ref(), size);

        let mut state = self.state.lock();
        state.summary = summary.clone();
        match size {
            Some((width, height)) => state.zoom.image_opened(width, height),
            None => state.zoom.image_closed(),
        }
        PreviewUpdate::Shown {
            path: first.path().to_path_buf(),
            summary,
        }
    }
}

/// Capture time, camera and pixel size joined with " | ", or `None` if nothing is known
pub fn metadata_summary(metadata: Option<&PhotoMetadata>, pixel_size: Option<(u32, u32)>) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(metadata) = metadata {
        if let Some(taken_at) = metadata.taken_at {
            parts.push(taken_at.format("%Y/%m/%d %H:%M:%S").to_string());
        }
        if let Some(camera) = metadata.camera_name() {
            parts.push(camera);
        }
    }
    if let Some((width, height)) = pixel_size.filter(|(w, h)| *w > 0 && *h > 0) {
        parts.push(format!("{}x{}", width, height));
    }

    (!parts.is_empty()).then(|| parts.join(" | "))
}
