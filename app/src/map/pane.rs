use crate::map::selection::select_in_rectangle;
use crate::map::viewport::{normalize_zoom_level, plan_markers, MapMarker, MapRect, MapUpdate};
use chrono::Local;
use parking_lot::Mutex;
use photo_metadata::{load_metadata, MetadataProvider};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use thumbnail_cache::ListItem;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Headless map pane: turns the current selection into markers and a viewport
pub struct MapPane<M: MetadataProvider> {
    provider: Arc<M>,
    default_zoom_level: AtomicU8,
    active_load: Mutex<Option<CancellationToken>>,
    markers: Mutex<Vec<MapMarker>>,
}

impl<M: MetadataProvider> MapPane<M> {
    pub fn new(provider: Arc<M>, default_zoom_level: u8) -> Self {
        Self {
            provider,
            default_zoom_level: AtomicU8::new(normalize_zoom_level(default_zoom_level)),
            active_load: Mutex::new(None),
            markers: Mutex::new(Vec::new()),
        }
    }

    pub fn default_zoom_level(&self) -> u8 {
        self.default_zoom_level.load(Ordering::Relaxed)
    }

    pub fn set_default_zoom_level(&self, level: u8) {
        self.default_zoom_level
            .store(normalize_zoom_level(level), Ordering::Relaxed);
    }

    /// Markers currently on the map
    pub fn markers(&self) -> Vec<MapMarker> {
        self.markers.lock().clone()
    }

    /// Load metadata for the selected photos and plan the map.
    ///
    /// A newer call cancels this one; the superseded call returns `None` and
    /// leaves the markers alone.
    pub async fn show_selection(&self, selected: &[Arc<ListItem>]) -> Option<MapUpdate> {
        // Swap under one lock so two overlapping calls cannot both stay live
        let token = CancellationToken::new();
        if let Some(previous) = self.active_load.lock().replace(token.clone()) {
            previous.cancel();
        }

        let photos: Vec<Arc<ListItem>> = selected
            .iter()
            .filter(|item| !item.is_folder())
            .cloned()
            .collect();

        if photos.is_empty() {
            self.markers.lock().clear();
            return Some(MapUpdate::NoSelection);
        }

        let loaded = load_metadata(self.provider.as_ref(), photos, &token).await;
        if token.is_cancelled() {
            debug!("Discarding metadata for a superseded selection");
            return None;
        }

        let plan = plan_markers(loaded, self.default_zoom_level(), Local::now().naive_local());
        info!("Map shows {} of {} selected photos", plan.markers().len(), selected.len());
        *self.markers.lock() = plan.markers().to_vec();
        Some(plan)
    }

    /// Photos whose marker falls inside `bounds`
    pub fn select_in_rectangle(&self, bounds: MapRect) -> Vec<Arc<ListItem>> {
        select_in_rectangle(&self.markers.lock(), bounds)
    }

    /// Cancel any metadata load in flight
    pub fn cancel(&self) {
        if let Some(token) = self.active_load.lock().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::viewport::{to_spherical_mercator, MapPoint};
    use async_trait::async_trait;
    use chrono::Utc;
    use photo_metadata::{GpsCoordinate, MetadataError, PhotoMetadata};
    use std::path::Path;
    use std::time::Duration;

    struct StubProvider {
        delay: Duration,
    }

    #[async_trait]
    impl MetadataProvider for StubProvider {
        async fn metadata(
            &self,
            path: &Path,
            _cancel: &CancellationToken,
        ) -> Result<Option<PhotoMetadata>, MetadataError> {
            tokio::time::sleep(self.delay).await;
            let location = match path.file_stem().and_then(|s| s.to_str()) {
                Some("tokyo") => Some(GpsCoordinate::new(35.6812, 139.7671)),
                Some("osaka") => Some(GpsCoordinate::new(34.7025, 135.4959)),
                Some("island") => Some(GpsCoordinate::new(0.0, 0.0)),
                _ => None,
            };
            Ok(Some(PhotoMetadata {
                location,
                ..Default::default()
            }))
        }
    }

    fn pane(delay_ms: u64) -> MapPane<StubProvider> {
        MapPane::new(
            Arc::new(StubProvider {
                delay: Duration::from_millis(delay_ms),
            }),
            12,
        )
    }

    fn photo(name: &str) -> Arc<ListItem> {
        Arc::new(ListItem::file(format!("/photos/{}", name), Utc::now(), 1, None))
    }

    #[tokio::test]
    async fn test_folders_only_is_no_selection() {
        let pane = pane(0);
        let folder = Arc::new(ListItem::folder("/photos/trip", Utc::now()));

        assert!(matches!(pane.show_selection(&[folder]).await, Some(MapUpdate::NoSelection)));
        assert!(matches!(pane.show_selection(&[]).await, Some(MapUpdate::NoSelection)));
    }

    #[tokio::test]
    async fn test_no_location_clears_markers() {
        let pane = pane(0);
        pane.show_selection(&[photo("tokyo.jpg")]).await;
        assert_eq!(pane.markers().len(), 1);

        let update = pane.show_selection(&[photo("plain.jpg"), photo("island.jpg")]).await;
        assert!(matches!(update, Some(MapUpdate::NoLocation)));
        assert!(pane.markers().is_empty());
    }

    #[tokio::test]
    async fn test_single_and_fit() {
        let pane = pane(0);

        match pane.show_selection(&[photo("tokyo.jpg"), photo("plain.jpg")]).await {
            Some(MapUpdate::Single { zoom_level, .. }) => assert_eq!(zoom_level, 12),
            other => panic!("unexpected update {:?}", other),
        }

        let update = pane.show_selection(&[photo("tokyo.jpg"), photo("osaka.jpg")]).await;
        assert!(matches!(update, Some(MapUpdate::Fit { .. })));
        assert_eq!(pane.markers().len(), 2);

        // Rubber-band around Tokyo only
        let tokyo = to_spherical_mercator(GpsCoordinate::new(35.6812, 139.7671));
        let bounds = MapRect::from_corners(
            MapPoint::new(tokyo.x - 10.0, tokyo.y - 10.0),
            MapPoint::new(tokyo.x + 10.0, tokyo.y + 10.0),
        );
        let selected = pane.select_in_rectangle(bounds);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name(), "tokyo.jpg");
    }

    #[tokio::test]
    async fn test_newer_selection_cancels_older() {
        let pane = pane(50);
        let first = [photo("tokyo.jpg")];
        let second = [photo("osaka.jpg")];

        let (old, new) = tokio::join!(pane.show_selection(&first), pane.show_selection(&second));

        assert!(old.is_none());
        assert!(matches!(new, Some(MapUpdate::Single { .. })));
        assert_eq!(pane.markers()[0].item.name(), "osaka.jpg");
    }

    #[tokio::test]
    async fn test_folder_selection_supersedes_pending_load() {
        let pane = pane(50);
        let photos = [photo("tokyo.jpg"), photo("osaka.jpg")];
        let folders = [Arc::new(ListItem::folder("/photos/trip", Utc::now()))];

        let (old, new) = tokio::join!(pane.show_selection(&photos), pane.show_selection(&folders));

        assert!(old.is_none());
        assert!(matches!(new, Some(MapUpdate::NoSelection)));
        assert!(pane.markers().is_empty());

        // The folders-only call left its own token behind, so a later selection starts clean
        let again = pane.show_selection(&[photo("osaka.jpg")]).await;
        assert!(matches!(again, Some(MapUpdate::Single { .. })));
    }

    #[test]
    fn test_zoom_level_is_normalized() {
        let pane = pane(0);
        pane.set_default_zoom_level(9);
        assert_eq!(pane.default_zoom_level(), 14);
        pane.set_default_zoom_level(18);
        assert_eq!(pane.default_zoom_level(), 18);
    }
}
