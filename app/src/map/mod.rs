pub mod pane;
pub mod selection;
pub mod viewport;

pub use pane::MapPane;
pub use selection::{is_within_click_threshold, select_in_rectangle, DEFAULT_CLICK_THRESHOLD};
pub use viewport::{
    fit_bounds, normalize_zoom_level, plan_markers, to_spherical_mercator, MapMarker, MapPoint, MapRect,
    MapUpdate, PinStyle, DEFAULT_ZOOM_LEVEL, ZOOM_LEVEL_OPTIONS,
};
