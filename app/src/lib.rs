//! PhotoGeo: the headless core of a photo browser
//!
//! A file browser pane lists folders and drives background thumbnail
//! generation, a map pane places the selected photos by their EXIF location,
//! a preview pane shows the first selected photo, and all of them share
//! selection state through the workspace.

pub mod config;
pub mod file_browser;
pub mod logging;
pub mod map;
pub mod preview;
pub mod workspace;

pub use config::{AppSettings, FileViewMode};
pub use file_browser::{FileBrowserPane, ListingFilter, LoadOutcome, SortColumn};
pub use map::{MapPane, MapUpdate};
pub use preview::{PreviewPane, PreviewUpdate};
pub use workspace::{SelectionSnapshot, WorkspaceState};
