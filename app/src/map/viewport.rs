//! Projection and viewport planning for photo markers

use chrono::{Duration, NaiveDateTime};
use photo_metadata::{GpsCoordinate, PhotoMetadata};
use std::f64::consts::PI;
use std::sync::Arc;
use thumbnail_cache::ListItem;

pub const ZOOM_LEVEL_OPTIONS: [u8; 6] = [8, 10, 12, 14, 16, 18];
pub const DEFAULT_ZOOM_LEVEL: u8 = 14;

/// Padding in projected meters used when all markers collapse to one spot
pub const MIN_FIT_PADDING: f64 = 500.0;
const FIT_PADDING_RATIO: f64 = 0.1;

/// Half the equator length in spherical Mercator meters
const ORIGIN_SHIFT: f64 = 20_037_508.342_789_244;

/// Supported zoom levels pass through, anything else falls back to the default
pub fn normalize_zoom_level(level: u8) -> u8 {
    if ZOOM_LEVEL_OPTIONS.contains(&level) {
        level
    } else {
        DEFAULT_ZOOM_LEVEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

impl MapPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in projected coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRect {
    pub min: MapPoint,
    pub max: MapPoint,
}

impl MapRect {
    /// Rectangle spanned by two arbitrary corners
    pub fn from_corners(a: MapPoint, b: MapPoint) -> Self {
        Self {
            min: MapPoint::new(a.x.min(b.x), a.y.min(b.y)),
            max: MapPoint::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Edges count as inside
    pub fn contains(&self, point: MapPoint) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// EPSG:3857 projection of a WGS84 coordinate
pub fn to_spherical_mercator(coordinate: GpsCoordinate) -> MapPoint {
    let x = coordinate.longitude * ORIGIN_SHIFT / 180.0;
    let y = ((90.0 + coordinate.latitude) * PI / 360.0).tan().ln() / (PI / 180.0);
    MapPoint::new(x, y * ORIGIN_SHIFT / 180.0)
}

/// Marker color bucket by how long ago the photo was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinStyle {
    /// Taken within the last 30 days
    Recent,
    /// Taken within the last year
    ThisYear,
    /// Older or undated
    Older,
}

impl PinStyle {
    pub fn for_capture_time(taken_at: Option<NaiveDateTime>, now: NaiveDateTime) -> Self {
        match taken_at.map(|taken| now - taken) {
            Some(age) if age <= Duration::days(30) => PinStyle::Recent,
            Some(age) if age <= Duration::days(365) => PinStyle::ThisYear,
            _ => PinStyle::Older,
        }
    }

    pub fn color_name(&self) -> &'static str {
        match self {
            PinStyle::Recent => "green",
            PinStyle::ThisYear => "blue",
            PinStyle::Older => "red",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapMarker {
    pub item: Arc<ListItem>,
    pub metadata: PhotoMetadata,
    pub coordinate: GpsCoordinate,
    pub position: MapPoint,
    pub pin: PinStyle,
}

/// What the map should show for a selection
#[derive(Debug, Clone)]
pub enum MapUpdate {
    /// Nothing but folders (or nothing at all) is selected
    NoSelection,
    /// Photos are selected but none carries a usable location
    NoLocation,
    /// Center on a single marker at the default zoom level
    Single { marker: MapMarker, zoom_level: u8 },
    /// Fit every marker into view
    Fit { markers: Vec<MapMarker>, bounds: MapRect },
}

impl MapUpdate {
    pub fn markers(&self) -> &[MapMarker] {
        match self {
            MapUpdate::Single { marker, .. } => std::slice::from_ref(marker),
            MapUpdate::Fit { markers, .. } => markers,
            MapUpdate::NoSelection | MapUpdate::NoLocation => &[],
        }
    }
}

/// Turn loaded metadata into a map update. Items without a valid location are left out.
pub fn plan_markers(
    loaded: Vec<(Arc<ListItem>, Option<PhotoMetadata>)>,
    zoom_level: u8,
    now: NaiveDateTime,
) -> MapUpdate {
    let mut markers: Vec<MapMarker> = loaded
        .into_iter()
        .filter_map(|(item, metadata)| {
            let metadata = metadata?;
            let coordinate = metadata.valid_location()?;
            Some(MapMarker {
                position: to_spherical_mercator(coordinate),
                pin: PinStyle::for_capture_time(metadata.taken_at, now),
                item,
                metadata,
                coordinate,
            })
        })
        .collect();

    match markers.len() {
        0 => MapUpdate::NoLocation,
        1 => MapUpdate::Single {
            marker: markers.remove(0),
            zoom_level: normalize_zoom_level(zoom_level),
        },
        _ => {
            let points: Vec<MapPoint> = markers.iter().map(|marker| marker.position).collect();
            match fit_bounds(&points) {
                Some(bounds) => MapUpdate::Fit { markers, bounds },
                None => MapUpdate::NoLocation,
            }
        }
    }
}

/// Bounding box of `points` padded by 10% of its larger side
pub fn fit_bounds(points: &[MapPoint]) -> Option<MapRect> {
    let first = *points.first()?;
    let (mut min, mut max) = (first, first);
    for point in &points[1..] {
        min = MapPoint::new(min.x.min(point.x), min.y.min(point.y));
        max = MapPoint::new(max.x.max(point.x), max.y.max(point.y));
    }

    let span = (max.x - min.x).max(max.y - min.y);
    let mut padding = span * FIT_PADDING_RATIO;
    if padding <= 0.0 {
        padding = MIN_FIT_PADDING;
    }

    Some(MapRect {
        min: MapPoint::new(min.x - padding, min.y - padding),
        max: MapPoint::new(max.x + padding, max.y + padding),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn located(name: &str, lat: f64, lon: f64) -> (Arc<ListItem>, Option<PhotoMetadata>) {
        let item = Arc::new(ListItem::file(format!("/photos/{}", name), Utc::now(), 1, None));
        let metadata = PhotoMetadata {
            location: Some(GpsCoordinate::new(lat, lon)),
            ..Default::default()
        };
        (item, Some(metadata))
    }

    #[test]
    fn test_projection() {
        let origin = to_spherical_mercator(GpsCoordinate::new(0.0, 0.0));
        assert!(origin.x.abs() < 1e-6 && origin.y.abs() < 1e-6);

        let east = to_spherical_mercator(GpsCoordinate::new(0.0, 180.0));
        assert!((east.x - ORIGIN_SHIFT).abs() < 1e-3);

        let tokyo = to_spherical_mercator(GpsCoordinate::new(35.6812, 139.7671));
        assert!((tokyo.x - 15_558_802.4).abs() < 1.0);
        assert!((tokyo.y - 4_256_843.2).abs() < 1.0);
    }

    #[test]
    fn test_zoom_normalization() {
        assert_eq!(normalize_zoom_level(10), 10);
        assert_eq!(normalize_zoom_level(13), DEFAULT_ZOOM_LEVEL);
        assert_eq!(normalize_zoom_level(0), DEFAULT_ZOOM_LEVEL);
    }

    #[test]
    fn test_plan_excludes_missing_and_null_island() {
        let no_metadata = (Arc::new(ListItem::file("/photos/x.jpg", Utc::now(), 1, None)), None);
        let plan = plan_markers(vec![no_metadata, located("zero.jpg", 0.0, 0.0)], 14, now());
        assert!(matches!(plan, MapUpdate::NoLocation));
        assert!(plan.markers().is_empty());
    }

    #[test]
    fn test_single_marker_uses_normalized_zoom() {
        let plan = plan_markers(vec![located("a.jpg", 35.0, 139.0)], 11, now());
        match plan {
            MapUpdate::Single { marker, zoom_level } => {
                assert_eq!(zoom_level, DEFAULT_ZOOM_LEVEL);
                assert_eq!(marker.item.name(), "a.jpg");
                assert_eq!(marker.pin, PinStyle::Older);
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_fit_pads_by_ten_percent() {
        let plan = plan_markers(
            vec![located("a.jpg", 35.0, 139.0), located("b.jpg", 35.5, 139.5)],
            14,
            now(),
        );
        let MapUpdate::Fit { markers, bounds } = plan else {
            panic!("expected a fit");
        };
        assert_eq!(markers.len(), 2);

        let a = markers[0].position;
        let b = markers[1].position;
        let span = (b.x - a.x).max(b.y - a.y);
        assert!((bounds.min.x - (a.x - span * 0.1)).abs() < 1e-6);
        assert!((bounds.max.y - (b.y + span * 0.1)).abs() < 1e-6);
        assert!(markers.iter().all(|m| bounds.contains(m.position)));
    }

    #[test]
    fn test_degenerate_fit_uses_minimum_padding() {
        let point = MapPoint::new(1000.0, 2000.0);
        let bounds = fit_bounds(&[point, point]).unwrap();
        assert_eq!(bounds.width(), 2.0 * MIN_FIT_PADDING);
        assert_eq!(bounds.min, MapPoint::new(500.0, 1500.0));
        assert!(fit_bounds(&[]).is_none());
    }

    #[test]
    fn test_pin_style_by_age() {
        let days_ago = |days| Some(now() - Duration::days(days));
        assert_eq!(PinStyle::for_capture_time(days_ago(3), now()), PinStyle::Recent);
        assert_eq!(PinStyle::for_capture_time(days_ago(200), now()), PinStyle::ThisYear);
        assert_eq!(PinStyle::for_capture_time(days_ago(400), now()), PinStyle::Older);
        assert_eq!(PinStyle::for_capture_time(None, now()), PinStyle::Older);
        assert_eq!(PinStyle::Recent.color_name(), "green");
    }
}
