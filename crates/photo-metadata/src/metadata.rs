//! Camera and location metadata for a single photo

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Threshold below which both axes count as "null island" (0, 0)
const NULL_ISLAND_EPSILON: f64 = 0.000_001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// GPS units without a fix tend to write (0, 0)
    pub fn is_null_island(&self) -> bool {
        self.latitude.abs() < NULL_ISLAND_EPSILON && self.longitude.abs() < NULL_ISLAND_EPSILON
    }

    pub fn is_in_range(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub location: Option<GpsCoordinate>,
    /// Meters above sea level, negative below
    pub altitude: Option<f64>,
    pub taken_at: Option<NaiveDateTime>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub pixel_width: Option<u32>,
    pub pixel_height: Option<u32>,
}

impl PhotoMetadata {
    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }

    /// The location if it is usable for placing a map marker
    pub fn valid_location(&self) -> Option<GpsCoordinate> {
        self.location
            .filter(|coordinate| coordinate.is_in_range() && !coordinate.is_null_island())
    }

    /// Display name of the camera, avoiding "Canon Canon EOS R5" style duplication
    pub fn camera_name(&self) -> Option<String> {
        let make = self.camera_make.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let model = self.camera_model.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (make, model) {
            (Some(make), Some(model)) => {
                if model.to_lowercase().starts_with(&make.to_lowercase()) {
                    Some(model.to_string())
                } else {
                    Some(format!("{} {}", make, model))
                }
            }
            (Some(make), None) => Some(make.to_string()),
            (None, Some(model)) => Some(model.to_string()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_island_is_not_a_valid_location() {
        let metadata = PhotoMetadata {
            location: Some(GpsCoordinate::new(0.0, 0.0000001)),
            ..Default::default()
        };

        assert!(metadata.has_location());
        assert!(metadata.valid_location().is_none());
    }

    #[test]
    fn test_out_of_range_location_rejected() {
        assert!(!GpsCoordinate::new(91.0, 10.0).is_in_range());
        assert!(!GpsCoordinate::new(10.0, -180.5).is_in_range());
        assert!(!GpsCoordinate::new(f64::NAN, 10.0).is_in_range());
        assert!(GpsCoordinate::new(-33.8688, 151.2093).is_in_range());
    }

    #[test]
    fn test_camera_name() {
        let mut metadata = PhotoMetadata {
            camera_make: Some("Canon".to_string()),
            camera_model: Some("Canon EOS R5".to_string()),
            ..Default::default()
        };
        assert_eq!(metadata.camera_name().as_deref(), Some("Canon EOS R5"));

        metadata.camera_model = Some("X100V".to_string());
        metadata.camera_make = Some("FUJIFILM".to_string());
        assert_eq!(metadata.camera_name().as_deref(), Some("FUJIFILM X100V"));

        metadata.camera_model = None;
        assert_eq!(metadata.camera_name().as_deref(), Some("FUJIFILM"));

        metadata.camera_make = Some("  ".to_string());
        assert_eq!(metadata.camera_name(), None);
    }
}
