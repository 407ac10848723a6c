//! Engine configuration.

use crate::diagnostics::DiagnosticsConfig;
use crate::handles::{DEFAULT_HANDLE_TOLERANCE, DEFAULT_MIN_EXTENT};
use crate::identity::{UserId, guest_identity};
use crate::shapes::{Circle, Rectangle, Shape, ShapeKind, Text};
use crate::viewport::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
/// Default heartbeat interval in milliseconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 5000;

/// Sizes given to shapes created without explicit dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementDefaults {
    pub rectangle_width: f64,
    pub rectangle_height: f64,
    pub circle_radius: f64,
    pub text_width: f64,
    pub text_height: f64,
    pub text_body: String,
}

impl Default for PlacementDefaults {
    fn default() -> Self {
        Self {
            rectangle_width: 100.0,
            rectangle_height: 100.0,
            circle_radius: 50.0,
            text_width: 200.0,
            text_height: 50.0,
            text_body: Text::DEFAULT_BODY.to_string(),
        }
    }
}

impl PlacementDefaults {
    /// A new shape of `kind` anchored at `point` with default dimensions.
    ///
    /// Rectangles and text are placed by their top-left corner, circles by
    /// their center.
    pub fn shape(&self, kind: ShapeKind, point: Point) -> Shape {
        match kind {
            ShapeKind::Rectangle => Shape::Rectangle(Rectangle::new(
                point,
                self.rectangle_width,
                self.rectangle_height,
            )),
            ShapeKind::Circle => Shape::Circle(Circle::new(point, self.circle_radius)),
            ShapeKind::Text => Shape::Text(Text::new(
                point,
                self.text_width,
                self.text_height,
                self.text_body.clone(),
            )),
        }
    }
}

/// Configuration for a [`CanvasEngine`](crate::engine::CanvasEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Identity to act as; a guest tag is generated when absent.
    pub identity: Option<UserId>,
    pub poll_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    /// Minimum width, height or diameter produced by resizing.
    pub min_extent: f64,
    /// Resize handle hit tolerance in screen pixels.
    pub handle_tolerance: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub placement: PlacementDefaults,
    #[serde(skip)]
    pub diagnostics: DiagnosticsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identity: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            min_extent: DEFAULT_MIN_EXTENT,
            handle_tolerance: DEFAULT_HANDLE_TOLERANCE,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            placement: PlacementDefaults::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Default config acting as `identity`.
    pub fn for_user(identity: impl Into<UserId>) -> Self {
        Self {
            identity: Some(identity.into()),
            ..Self::default()
        }
    }

    /// Attach a diagnostics config.
    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsConfig) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The configured identity, or a fresh guest tag.
    pub fn resolve_identity(&self) -> UserId {
        self.identity.clone().unwrap_or_else(guest_identity)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}
