//! User settings persisted as JSON in the per-user data directory

use crate::map::normalize_zoom_level;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thumbnail_cache::ThumbnailConfig;
use tracing::{error, info, warn};

pub const APP_DIR_NAME: &str = "PhotoGeoExplorer";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// How the file browser lays out its listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum FileViewMode {
    Icon,
    List,
    #[default]
    Details,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub last_folder_path: Option<PathBuf>,
    pub show_images_only: bool,
    pub file_view_mode: FileViewMode,
    pub map_default_zoom_level: u8,
    pub thumbnails: ThumbnailConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            last_folder_path: None,
            show_images_only: true,
            file_view_mode: FileViewMode::default(),
            map_default_zoom_level: crate::map::DEFAULT_ZOOM_LEVEL,
            thumbnails: ThumbnailConfig::default(),
        }
    }
}

impl AppSettings {
    /// Root of everything the app stores per user
    pub fn data_dir() -> Result<PathBuf> {
        let base = dirs::data_local_dir().context("Unable to find local data directory")?;
        Ok(base.join(APP_DIR_NAME))
    }

    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join(SETTINGS_FILE_NAME))
    }

    /// Load settings from `path`.
    ///
    /// A missing file yields the defaults. So does an unreadable or corrupt
    /// one: the failure is logged and the app starts with a clean slate.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::read(path) {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to load settings, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    /// Read settings from a file the user picked. `None` if it is missing or invalid.
    pub fn import_from(path: &Path) -> Option<Self> {
        if path.as_os_str().is_empty() || !path.is_file() {
            return None;
        }

        match Self::read(path) {
            Ok(settings) => Some(settings),
            Err(e) => {
                error!("Failed to import settings: {:#}", e);
                None
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let mut settings: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;

        let zoom = normalize_zoom_level(settings.map_default_zoom_level);
        if zoom != settings.map_default_zoom_level {
            warn!(
                "Unsupported map zoom level {} in settings, using {}",
                settings.map_default_zoom_level, zoom
            );
            settings.map_default_zoom_level = zoom;
        }

        Ok(settings)
    }

    /// Write through a temp file next to `path` so a crash never leaves half a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create settings directory: {}", parent.display()))?;

        let json = serde_json::to_string_pretty(self)?;
        let mut temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        temp.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        temp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace settings: {}", path.display()))?;
        Ok(())
    }

    /// Copy the settings to a file the user picked. An empty path does nothing.
    pub fn export_to(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        self.save_to(path)
    }

    /// The folder to reopen: the remembered one, or its nearest ancestor that still exists
    pub fn restore_folder(&self) -> Option<PathBuf> {
        let remembered = self.last_folder_path.as_deref()?;
        let found = find_existing_ancestor(remembered)?;
        if found != remembered {
            info!(
                "Last folder {} is gone, falling back to {}",
                remembered.display(),
                found.display()
            );
        }
        Some(found)
    }
}

fn find_existing_ancestor(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }
    let absolute = crate::file_browser::normalize_path(path);
    absolute.ancestors().find(|dir| dir.is_dir()).map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    #[test]
    fn test_missing_file_yields_defaults() -> Result<()> {
        let temp_dir = tempdir()?;
        let settings = AppSettings::load_from(&temp_dir.path().join("settings.json"));

        assert_eq!(settings, AppSettings::default());
        assert!(settings.show_images_only);
        assert_eq!(settings.file_view_mode, FileViewMode::Details);
        assert_eq!(settings.last_folder_path, None);
        assert_eq!(settings.map_default_zoom_level, 14);
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("nested").join("settings.json");

        let mut settings = AppSettings::default();
        settings.last_folder_path = Some(temp_dir.path().join("photos"));
        settings.show_images_only = false;
        settings.file_view_mode = FileViewMode::Icon;
        settings.map_default_zoom_level = 10;
        settings.thumbnails.concurrency = 5;
        settings.save_to(&path)?;

        assert_eq!(AppSettings::load_from(&path), settings);

        // Overwriting leaves only the settings file behind, no temp files
        settings.save_to(&path)?;
        let entries = fs::read_dir(temp_dir.path().join("nested"))?.count();
        assert_eq!(entries, 1);
        Ok(())
    }

    #[test]
    fn test_view_mode_is_camel_case() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{ "fileViewMode": "list", "lastFolderPath": "/photos/trip" }"#)?;

        let settings = AppSettings::load_from(&path);
        assert_eq!(settings.file_view_mode, FileViewMode::List);
        assert_eq!(settings.last_folder_path, Some(PathBuf::from("/photos/trip")));

        let json = serde_json::to_string(&settings)?;
        assert!(json.contains(r#""fileViewMode":"list""#));
        Ok(())
    }

    #[test]
    fn test_partial_file_and_zoom_normalization() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{ "mapDefaultZoomLevel": 13, "thumbnails": { "maxSize": 128 } }"#)?;

        let settings = AppSettings::load_from(&path);
        assert!(settings.show_images_only);
        assert_eq!(settings.map_default_zoom_level, 14);
        assert_eq!(settings.thumbnails.max_size, 128);
        assert_eq!(settings.thumbnails.concurrency, 3);
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_malformed_file_falls_back_to_defaults() -> Result<()> {
        let temp_dir = tempdir()?;
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{ "showImagesOnly": tru"#)?;

        let settings = AppSettings::load_from(&path);
        assert_eq!(settings, AppSettings::default());
        assert!(logs_contain("Failed to load settings"));
        assert!(logs_contain("settings.json"));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_export_then_import() -> Result<()> {
        let temp_dir = tempdir()?;
        let exported = temp_dir.path().join("backup").join("photogeo.json");

        let mut settings = AppSettings::default();
        settings.show_images_only = false;
        settings.file_view_mode = FileViewMode::List;
        settings.export_to(&exported)?;
        settings.export_to(Path::new(""))?;

        assert_eq!(AppSettings::import_from(&exported), Some(settings));
        assert_eq!(AppSettings::import_from(&temp_dir.path().join("missing.json")), None);

        let broken = temp_dir.path().join("broken.json");
        fs::write(&broken, "{ not json")?;
        assert_eq!(AppSettings::import_from(&broken), None);
        assert!(logs_contain("Failed to import settings"));
        Ok(())
    }

    #[test]
    fn test_restore_folder_walks_up_to_existing_ancestor() -> Result<()> {
        let temp_dir = tempdir()?;
        let trip = temp_dir.path().join("photos").join("trip");
        fs::create_dir_all(&trip)?;

        let mut settings = AppSettings::default();
        assert_eq!(settings.restore_folder(), None);

        settings.last_folder_path = Some(trip.clone());
        assert_eq!(settings.restore_folder(), Some(trip.clone()));

        settings.last_folder_path = Some(trip.join("deleted").join("deeper"));
        assert_eq!(settings.restore_folder(), Some(trip));
        Ok(())
    }
}
