//! Zoom bookkeeping for the single-photo preview
//!
//! The preview either fits the image to its viewport or keeps a zoom factor
//! the user picked. Display scaling changes (moving the window to another
//! monitor) keep a manual zoom at the same physical size.

use tracing::info;

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 6.0;
/// Multiplier for one zoom-in step; zooming out divides by it
pub const ZOOM_STEP: f64 = 1.2;
/// Multiplier for one mouse wheel notch
pub const WHEEL_STEP: f64 = 1.1;

const SCALE_EPSILON: f64 = 0.0001;

/// Largest zoom at which the whole image fits the viewport, clamped to `[min, max]`.
/// Degenerate sizes yield 1.0.
pub fn fit_zoom_factor(
    image_width: f64,
    image_height: f64,
    viewport_width: f64,
    viewport_height: f64,
    min: f64,
    max: f64,
) -> f64 {
    if image_width <= 0.0 || image_height <= 0.0 || viewport_width <= 0.0 || viewport_height <= 0.0 {
        return 1.0;
    }
    let scale = (viewport_width / image_width).min(viewport_height / image_height);
    scale.clamp(min, max)
}

/// Zoom that keeps the on-screen size when the display scale goes from `old_scale` to `new_scale`
pub fn dpi_corrected_zoom(current: f64, old_scale: f64, new_scale: f64, min: f64, max: f64) -> f64 {
    if old_scale <= 0.0 || new_scale <= 0.0 {
        return current;
    }
    (current * old_scale / new_scale).clamp(min, max)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoomState {
    fit_to_window: bool,
    zoom: f64,
    display_scale: f64,
    image_size: Option<(u32, u32)>,
    viewport: (f64, f64),
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            fit_to_window: true,
            zoom: 1.0,
            display_scale: 1.0,
            image_size: None,
            viewport: (0.0, 0.0),
        }
    }
}

impl ZoomState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn is_fit_to_window(&self) -> bool {
        self.fit_to_window
    }

    pub fn display_scale(&self) -> f64 {
        self.display_scale
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    /// A new image always starts fitted to the viewport
    pub fn image_opened(&mut self, width: u32, height: u32) {
        self.image_size = Some((width, height));
        self.fit_to_window = true;
        self.refit();
    }

    pub fn image_closed(&mut self) {
        self.image_size = None;
    }

    pub fn viewport_resized(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
        self.refit();
    }

    /// Go back to fitting the image to the viewport
    pub fn fit(&mut self) {
        self.fit_to_window = true;
        self.refit();
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / ZOOM_STEP);
    }

    /// One wheel notch; a positive delta zooms in
    pub fn wheel(&mut self, delta: i32) {
        let factor = if delta > 0 { WHEEL_STEP } else { 1.0 / WHEEL_STEP };
        self.zoom_by(factor);
    }

    fn zoom_by(&mut self, factor: f64) {
        self.fit_to_window = false;
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn display_scale_changed(&mut self, new_scale: f64) {
        if (new_scale - self.display_scale).abs() < SCALE_EPSILON {
            return;
        }
        info!("Display scale changed: {} -> {}", self.display_scale, new_scale);

        // A fitted image gets recomputed on the next viewport change anyway
        if !(self.fit_to_window && self.image_size.is_some()) {
            let corrected = dpi_corrected_zoom(self.zoom, self.display_scale, new_scale, MIN_ZOOM, MAX_ZOOM);
            info!("Preview zoom corrected: {} -> {}", self.zoom, corrected);
            self.zoom = corrected;
        }
        self.display_scale = new_scale;
    }

    fn refit(&mut self) {
        if !self.fit_to_window {
            return;
        }
        if let Some((width, height)) = self.image_size {
            let (viewport_width, viewport_height) = self.viewport;
            self.zoom = fit_zoom_factor(
                width as f64,
                height as f64,
                viewport_width,
                viewport_height,
                MIN_ZOOM,
                MAX_ZOOM,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fit_zoom_factor() {
        // Landscape photo in a square viewport is bound by width
        assert!(approx(fit_zoom_factor(4000.0, 3000.0, 800.0, 800.0, MIN_ZOOM, MAX_ZOOM), 0.2));
        // Small image is enlarged up to the cap
        assert!(approx(fit_zoom_factor(100.0, 50.0, 1000.0, 1000.0, MIN_ZOOM, MAX_ZOOM), 6.0));
        assert!(approx(fit_zoom_factor(100_000.0, 100.0, 800.0, 600.0, MIN_ZOOM, MAX_ZOOM), 0.1));
        assert!(approx(fit_zoom_factor(0.0, 3000.0, 800.0, 600.0, MIN_ZOOM, MAX_ZOOM), 1.0));
        assert!(approx(fit_zoom_factor(4000.0, 3000.0, 800.0, -1.0, MIN_ZOOM, MAX_ZOOM), 1.0));
    }

    #[test]
    fn test_dpi_corrected_zoom() {
        assert!(approx(dpi_corrected_zoom(2.0, 1.0, 2.0, MIN_ZOOM, MAX_ZOOM), 1.0));
        assert!(approx(dpi_corrected_zoom(4.0, 2.0, 1.0, MIN_ZOOM, MAX_ZOOM), 6.0));
        assert!(approx(dpi_corrected_zoom(1.5, 0.0, 2.0, MIN_ZOOM, MAX_ZOOM), 1.5));
        assert!(approx(dpi_corrected_zoom(1.5, 1.0, 0.0, MIN_ZOOM, MAX_ZOOM), 1.5));
    }

    #[test]
    fn test_open_fits_and_follows_viewport() {
        let mut state = ZoomState::new();
        state.viewport_resized(800.0, 600.0);
        state.image_opened(1600, 1200);
        assert!(state.is_fit_to_window());
        assert!(approx(state.zoom(), 0.5));

        state.viewport_resized(400.0, 600.0);
        assert!(approx(state.zoom(), 0.25));
    }

    #[test]
    fn test_manual_zoom_leaves_fit_mode() {
        let mut state = ZoomState::new();
        state.viewport_resized(800.0, 600.0);
        state.image_opened(1600, 1200);

        state.zoom_in();
        assert!(!state.is_fit_to_window());
        assert!(approx(state.zoom(), 0.6));

        // Resizing no longer changes a manual zoom
        state.viewport_resized(1600.0, 1200.0);
        assert!(approx(state.zoom(), 0.6));

        state.zoom_out();
        assert!(approx(state.zoom(), 0.5));

        state.wheel(120);
        assert!(approx(state.zoom(), 0.55));
        state.wheel(-120);
        assert!(approx(state.zoom(), 0.5));

        state.fit();
        assert!(state.is_fit_to_window());
        assert!(approx(state.zoom(), 1.0));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut state = ZoomState::new();
        for _ in 0..50 {
            state.zoom_in();
        }
        assert!(approx(state.zoom(), MAX_ZOOM));
        for _ in 0..100 {
            state.wheel(-1);
        }
        assert!(approx(state.zoom(), MIN_ZOOM));
    }

    #[test]
    fn test_display_scale_change() {
        let mut state = ZoomState::new();
        state.viewport_resized(800.0, 600.0);
        state.image_opened(1600, 1200);

        // Fitted image: only the scale is recorded
        state.display_scale_changed(2.0);
        assert!(approx(state.display_scale(), 2.0));
        assert!(approx(state.zoom(), 0.5));

        // Manual zoom keeps its physical size
        state.zoom_in();
        state.display_scale_changed(1.0);
        assert!(approx(state.zoom(), 1.2));

        // Changes below the threshold are ignored
        state.display_scale_changed(1.00001);
        assert!(approx(state.display_scale(), 1.0));
        assert!(approx(state.zoom(), 1.2));
    }
}
