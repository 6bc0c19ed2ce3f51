use crate::map::viewport::{MapMarker, MapPoint, MapRect};
use anyhow::{ensure, Result};
use std::collections::HashSet;
use std::sync::Arc;
use thumbnail_cache::ListItem;

/// Pointer travel in pixels below which a drag is treated as a click
pub const DEFAULT_CLICK_THRESHOLD: f64 = 6.0;

/// Photos whose marker lies inside `bounds`, each photo once (paths compared case-insensitively)
pub fn select_in_rectangle(markers: &[MapMarker], bounds: MapRect) -> Vec<Arc<ListItem>> {
    let mut seen = HashSet::new();
    markers
        .iter()
        .filter(|marker| bounds.contains(marker.position))
        .filter(|marker| seen.insert(marker.item.path().to_string_lossy().to_lowercase()))
        .map(|marker| Arc::clone(&marker.item))
        .collect()
}

/// Whether the pointer stayed within `threshold` pixels on both axes
pub fn is_within_click_threshold(start: MapPoint, current: MapPoint, threshold: f64) -> Result<bool> {
    ensure!(threshold >= 0.0, "Threshold must be greater than or equal to zero, got {}", threshold);
    Ok((current.x - start.x).abs() <= threshold && (current.y - start.y).abs() <= threshold)
}
