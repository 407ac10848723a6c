//! Rectangle shape.

use super::{Geometry, ShapeId, ShapeTrait, rect_contains_inclusive};
use crate::identity::UserId;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An axis-aligned rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ShapeId,
    /// Top-left corner position.
    #[serde(flatten)]
    pub position: Point,
    /// Width of the rectangle.
    pub width: f64,
    /// Height of the rectangle.
    pub height: f64,
    /// Users selecting this shape (at most one at steady state).
    #[serde(rename = "selectedBy", default)]
    pub selected_by: Vec<UserId>,
}

impl Rectangle {
    /// Create a new rectangle.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            selected_by: Vec::new(),
        }
    }

    /// Replace the generated identifier (for data that already has one).
    pub fn with_id(mut self, id: ShapeId) -> Self {
        self.id = id;
        self
    }

    /// Get the rectangle as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

impl ShapeTrait for Rectangle {
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
    fn test_new_is_unselected() {
        let rect = Rectangle::new(Point::new(10.0, 20.0), 100.0, 50.0);
        assert!(rect.selected_by.is_empty());
        assert_eq!(rect.as_rect(), Rect::new(10.0, 20.0, 110.0, 70.0));
    }

    #[test]
    fn test_wire_form() {
        let id = Uuid::new_v4();
        let rect = Rectangle::new(Point::new(1.0, 2.0), 3.0, 4.0).with_id(id);
        let json = serde_json::to_value(&rect).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": id, "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0, "selectedBy": []
            })
        );

        let parsed: Rectangle =
            serde_json::from_str(&format!(r#"{{"id":"{id}","x":1,"y":2,"width":3,"height":4}}"#))
                .unwrap();
        assert_eq!(parsed, rect);
    }

    #[test]
    fn test_contains() {
        let rect = Rectangle::new(Point::new(10.0, 10.0), 20.0, 20.0);
        assert!(rect.contains(Point::new(15.0, 15.0)));
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(rect.contains(Point::new(30.0, 30.0)));
        assert!(!rect.contains(Point::new(31.0, 15.0)));
        assert!(!rect.contains(Point::new(9.9, 15.0)));
    }

    #[test]
    fn test_round_geometry_refused() {
        let mut rect = Rectangle::new(Point::new(10.0, 20.0), 100.0, 50.0);
        let before = rect.clone();
        assert!(!rect.set_geometry(Geometry::Round {
            center: Point::ZERO,
            radius: 5.0
        }));
        assert_eq!(rect, before);
    }
}
