pub mod pane;
pub mod zoom;

pub use pane::{metadata_summary, PreviewPane, PreviewUpdate};
pub use zoom::{dpi_corrected_zoom, fit_zoom_factor, ZoomState, MAX_ZOOM, MIN_ZOOM, WHEEL_STEP, ZOOM_STEP};
