//! Text shape.

use super::{Geometry, ShapeId, ShapeTrait, rect_contains_inclusive};
use crate::identity::UserId;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A text block with a fixed box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ShapeId,
    /// Position (top-left corner of the text box).
    #[serde(flatten)]
    pub position: Point,
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
    /// The text content.
    #[serde(default)]
    pub text: String,
    /// Users selecting this shape (at most one at steady state).
    #[serde(rename = "selectedBy", default)]
    pub selected_by: Vec<UserId>,
}

impl Text {
    /// Body given to text blocks created without one.
    pub const DEFAULT_BODY: &'static str = "Text";

    /// Create a new text shape.
    pub fn new(position: Point, width: f64, height: f64, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            text: text.into(),
            selected_by: Vec::new(),
        }
    }

    /// Replace the generated identifier (for data that already has one).
    pub fn with_id(mut self, id: ShapeId) -> Self {
        self.id = id;
        self
    }

    fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

impl ShapeTrait for Text {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn contains(&self, point: Point) -> bool {
        rect_contains_inclusive(self.as_rect(), point)
    }

    fn geometry(&self) -> Geometry {
        Geometry::Boxed {
            position: self.position,
            width: self.width,
            height: self.height,
        }
    }

    fn set_geometry(&mut self, geometry: Geometry) -> bool {
        match geometry {
            Geometry::Boxed {
                position,
                width,
                height,
            } => {
                self.position = position;
                self.width = width;
                self.height = height;
                true
            }
            Geometry::Round { .. } => false,
        }
    }

    fn selected_by(&self) -> &[UserId] {
        &self.selected_by
    }

    fn selected_by_mut(&mut self) -> &mut Vec<UserId> {
        &mut self.selected_by
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_creation() {
        let text = Text::new(Point::new(100.0, 100.0), 200.0, 50.0, "Hello");
        assert_eq!(text.text, "Hello");
        assert!((text.width - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_contains_uses_box() {
        let text = Text::new(Point::new(0.0, 0.0), 200.0, 50.0, "");
        assert!(text.contains(Point::new(200.0, 50.0)));
        assert!(text.contains(Point::new(100.0, 25.0)));
        assert!(!text.contains(Point::new(100.0, 51.0)));
    }

    #[test]
    fn test_missing_body_deserializes_empty() {
        let json = r#"{"id":"6f1c1d0e-8d2a-4a53-9d0b-3b8b8f0f6a13","x":1,"y":2,"width":3,"height":4}"#;
        let text: Text = serde_json::from_str(json).unwrap();
        assert!(text.text.is_empty());
        assert_eq!(text.position, Point::new(1.0, 2.0));
    }
}
