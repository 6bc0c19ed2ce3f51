//! EXIF-backed metadata provider
//!
//! Parses the EXIF container of JPEG, TIFF, PNG, WebP and HEIF files with
//! `kamadak-exif` on the blocking pool and maps the handful of tags the map
//! pane cares about: GPS position and altitude, capture time, camera and
//! pixel dimensions.

use crate::metadata::{GpsCoordinate, PhotoMetadata};
use crate::provider::{MetadataError, MetadataProvider};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use exif::{Exif, In, Rational, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadataProvider;

impl ExifMetadataProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetadataProvider for ExifMetadataProvider {
    async fn metadata(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<PhotoMetadata>, MetadataError> {
        if cancel.is_cancelled() {
            return Err(MetadataError::Cancelled);
        }

        let owned = path.to_path_buf();
        let read = tokio::task::spawn_blocking(move || read_metadata(&owned));

        tokio::select! {
            _ = cancel.cancelled() => Err(MetadataError::Cancelled),
            joined = read => joined.map_err(|e| MetadataError::Worker(e.to_string()))?,
        }
    }
}

/// Read metadata synchronously. Files without an EXIF block yield `Ok(None)`.
pub fn read_metadata(path: &Path) -> Result<Option<PhotoMetadata>, MetadataError> {
    let file = File::open(path).map_err(|e| MetadataError::from_io(path, e))?;
    let mut reader = BufReader::new(file);

    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(exif::Error::Io(e)) => return Err(MetadataError::from_io(path, e)),
        Err(e) => {
            return Err(MetadataError::InvalidData {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    Ok(Some(metadata_from_exif(&exif)))
}

fn metadata_from_exif(exif: &Exif) -> PhotoMetadata {
    PhotoMetadata {
        location: gps_coordinate(exif),
        altitude: altitude(exif),
        taken_at: capture_time(exif),
        camera_make: ascii_field(exif, Tag::Make),
        camera_model: ascii_field(exif, Tag::Model),
        pixel_width: uint_field(exif, Tag::PixelXDimension)
            .or_else(|| uint_field(exif, Tag::ImageWidth)),
        pixel_height: uint_field(exif, Tag::PixelYDimension)
            .or_else(|| uint_field(exif, Tag::ImageLength)),
    }
}

fn gps_coordinate(exif: &Exif) -> Option<GpsCoordinate> {
    let latitude = rational_field(exif, Tag::GPSLatitude).and_then(dms_to_degrees)?;
    let longitude = rational_field(exif, Tag::GPSLongitude).and_then(dms_to_degrees)?;

    let latitude = apply_reference(latitude, ascii_field(exif, Tag::GPSLatitudeRef).as_deref(), "S");
    let longitude = apply_reference(longitude, ascii_field(exif, Tag::GPSLongitudeRef).as_deref(), "W");

    Some(GpsCoordinate::new(latitude, longitude))
}

fn altitude(exif: &Exif) -> Option<f64> {
    let value = rational_field(exif, Tag::GPSAltitude)?
        .first()
        .filter(|r| r.denom != 0)?
        .to_f64();

    // GPSAltitudeRef 1 means below sea level
    let below_sea_level = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        == Some(1);

    Some(if below_sea_level { -value } else { value })
}

fn capture_time(exif: &Exif) -> Option<NaiveDateTime> {
    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    let Value::Ascii(ref values) = field.value else {
        return None;
    };
    let dt = exif::DateTime::from_ascii(values.first()?).ok()?;

    NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?
        .and_hms_opt(dt.hour.into(), dt.minute.into(), dt.second.into())
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match field.value {
        Value::Ascii(ref values) => {
            let text = String::from_utf8_lossy(values.first()?);
            let trimmed = text.trim_matches(char::from(0)).trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

fn rational_field(exif: &Exif, tag: Tag) -> Option<&[Rational]> {
    match exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(ref values) => Some(values.as_slice()),
        _ => None,
    }
}

fn uint_field(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

/// Degrees/minutes/seconds rationals to decimal degrees (always positive)
fn dms_to_degrees(values: &[Rational]) -> Option<f64> {
    let [degrees, minutes, seconds] = values.get(..3)? else {
        return None;
    };
    if degrees.denom == 0 || minutes.denom == 0 || seconds.denom == 0 {
        return None;
    }

    Some(degrees.to_f64() + minutes.to_f64() / 60.0 + seconds.to_f64() / 3600.0)
}

fn apply_reference(value: f64, reference: Option<&str>, negative: &str) -> f64 {
    match reference {
        Some(r) if r.eq_ignore_ascii_case(negative) => -value,
        _ => value,
    }
}
