//! Viewport: pan and zoom transform between screen and canvas space.

use crate::wire::{PanOffset, ViewportState};
use kurbo::{Affine, Point, Vec2};

/// Zoom multiplier for one wheel step.
pub const ZOOM_STEP: f64 = 1.1;
/// Zoom multiplier for the zoom in/out buttons.
pub const BUTTON_ZOOM_STEP: f64 = 1.2;
/// Default minimum zoom level.
pub const DEFAULT_MIN_ZOOM: f64 = 0.1;
/// Default maximum zoom level.
pub const DEFAULT_MAX_ZOOM: f64 = 10.0;

/// Viewport manages the view transform for the canvas.
///
/// `canvas = (screen - pan) / zoom`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// Current translation offset, in screen pixels.
    pub pan: Vec2,
    /// Current zoom level (1.0 = 100%).
    pub zoom: f64,
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl Viewport {
    /// Create a new viewport with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a viewport with custom zoom limits.
    pub fn with_limits(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            min_zoom,
            max_zoom,
            ..Self::default()
        }
    }

    /// Transform from canvas to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    /// Convert a screen point to canvas coordinates.
    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        ((screen_point - self.pan).to_vec2() / self.zoom).to_point()
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        self.transform() * canvas_point
    }

    /// Pan by a delta in screen coordinates.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Zoom by `factor`, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let canvas_point = self.screen_to_canvas(screen_point);
        self.zoom = new_zoom;

        // Keep canvas_point under screen_point
        let new_screen = self.canvas_to_screen(canvas_point);
        self.pan += screen_point - new_screen;
    }

    /// Apply one wheel step at a screen point (positive `delta_y` zooms out).
    pub fn wheel(&mut self, screen_point: Point, delta_y: f64) {
        let factor = if delta_y > 0.0 { 1.0 / ZOOM_STEP } else { ZOOM_STEP };
        self.zoom_at(screen_point, factor);
    }

    /// Zoom in one button step around the canvas origin.
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * BUTTON_ZOOM_STEP).clamp(self.min_zoom, self.max_zoom);
    }

    /// Zoom out one button step around the canvas origin.
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / BUTTON_ZOOM_STEP).clamp(self.min_zoom, self.max_zoom);
    }

    /// Reset pan and zoom.
    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Wire form sent along with agent requests.
    pub fn state(&self) -> ViewportState {
        ViewportState {
            zoom: self.zoom,
            pan: PanOffset {
                x: self.pan.x,
                y: self.pan.y,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport() {
        let viewport = Viewport::new();
        assert_eq!(viewport.pan, Vec2::ZERO);
        assert!((viewport.zoom - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_canvas() {
        let mut viewport = Viewport::new();
        viewport.pan = Vec2::new(50.0, 100.0);
        viewport.zoom = 2.0;
        let canvas = viewport.screen_to_canvas(Point::new(150.0, 300.0));
        assert!((canvas.x - 50.0).abs() < f64::EPSILON);
        assert!((canvas.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let mut viewport = Viewport::new();
        viewport.pan = Vec2::new(30.0, -20.0);
        viewport.zoom = 1.5;

        let original = Point::new(123.0, 456.0);
        let back = viewport.canvas_to_screen(viewport.screen_to_canvas(original));
        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_zoom_at_keeps_point_fixed() {
        let mut viewport = Viewport::new();
        let anchor = Point::new(200.0, 100.0);
        let before = viewport.screen_to_canvas(anchor);
        viewport.wheel(anchor, -1.0);
        let after = viewport.screen_to_canvas(anchor);
        assert!((viewport.zoom - ZOOM_STEP).abs() < 1e-10);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut viewport = Viewport::new();
        viewport.zoom_at(Point::ZERO, 0.001);
        assert!((viewport.zoom - viewport.min_zoom).abs() < f64::EPSILON);

        viewport.zoom_at(Point::ZERO, 1e6);
        assert!((viewport.zoom - viewport.max_zoom).abs() < f64::EPSILON);
    }

    #[test]
    fn test_button_zoom_leaves_pan() {
        let mut viewport = Viewport::new();
        viewport.pan = Vec2::new(5.0, 5.0);
        viewport.zoom_in();
        assert!((viewport.zoom - BUTTON_ZOOM_STEP).abs() < 1e-10);
        viewport.zoom_out();
        assert!((viewport.zoom - 1.0).abs() < 1e-10);
        assert_eq!(viewport.pan, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn test_wire_state() {
        let mut viewport = Viewport::new();
        viewport.pan_by(Vec2::new(10.0, 20.0));
        let json = serde_json::to_value(viewport.state()).unwrap();
        assert_eq!(json, serde_json::json!({"zoom": 1.0, "pan": {"x": 10.0, "y": 20.0}}));
    }
}
