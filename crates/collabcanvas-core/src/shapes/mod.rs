//! Shape definitions for the shared canvas.

mod circle;
mod rectangle;
mod text;

pub use circle::Circle;
pub use rectangle::Rectangle;
pub use text::Text;

use crate::identity::UserId;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// The kind of a shape, used by placement tools and agent commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Text,
}

impl ShapeKind {
    /// Wire name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Text => "text",
        }
    }
}

/// Position and extent of a shape, independent of its other fields.
///
/// Boxed shapes (rectangles, text) are anchored at their top-left corner,
/// round shapes at their center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Boxed {
        position: Point,
        width: f64,
        height: f64,
    },
    Round {
        center: Point,
        radius: f64,
    },
}

impl Geometry {
    /// Axis-aligned bounding box of this geometry.
    pub fn bounds(&self) -> Rect {
        match *self {
            Geometry::Boxed {
                position,
                width,
                height,
            } => Rect::new(position.x, position.y, position.x + width, position.y + height),
            Geometry::Round { center, radius } => Rect::new(
                center.x - radius,
                center.y - radius,
                center.x + radius,
                center.y + radius,
            ),
        }
    }

    /// The anchor point (top-left for boxes, center for circles).
    pub fn anchor(&self) -> Point {
        match *self {
            Geometry::Boxed { position, .. } => position,
            Geometry::Round { center, .. } => center,
        }
    }

    /// Return this geometry moved by `delta`.
    pub fn translated(&self, delta: Vec2) -> Self {
        match *self {
            Geometry::Boxed {
                position,
                width,
                height,
            } => Geometry::Boxed {
                position: position + delta,
                width,
                height,
            },
            Geometry::Round { center, radius } => Geometry::Round {
                center: center + delta,
                radius,
            },
        }
    }

    /// Return this geometry with its anchor moved to `anchor`.
    pub fn with_anchor(&self, anchor: Point) -> Self {
        self.translated(anchor - self.anchor())
    }
}

/// Inclusive axis-aligned containment (points on an edge count as inside).
///
/// `kurbo::Rect::contains` excludes the far edges, which is not what
/// hit testing wants here.
pub fn rect_contains_inclusive(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Get the bounding box in canvas coordinates.
    fn bounds(&self) -> Rect;

    /// Check if a point (in canvas coordinates) lies inside this shape.
    fn contains(&self, point: Point) -> bool;

    /// Snapshot of position and extent.
    fn geometry(&self) -> Geometry;

    /// Overwrite position and extent.
    /// Returns false (and leaves the shape untouched) if the geometry
    /// belongs to a different kind of shape.
    fn set_geometry(&mut self, geometry: Geometry) -> bool;

    /// Users currently selecting this shape.
    fn selected_by(&self) -> &[UserId];

    /// Mutable access to the selection list.
    fn selected_by_mut(&mut self) -> &mut Vec<UserId>;
}

/// Enum wrapper for all shape types (for serialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Rectangle(Rectangle),
    Circle(Circle),
    Text(Text),
}

impl From<Rectangle> for Shape {
    fn from(rect: Rectangle) -> Self {
        Shape::Rectangle(rect)
    }
}

impl From<Circle> for Shape {
    fn from(circle: Circle) -> Self {
        Shape::Circle(circle)
    }
}

impl From<Text> for Shape {
    fn from(text: Text) -> Self {
        Shape::Text(text)
    }
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::Rectangle(s) => s.id(),
            Shape::Circle(s) => s.id(),
            Shape::Text(s) => s.id(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Text(_) => ShapeKind::Text,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Rectangle(s) => s.bounds(),
            Shape::Circle(s) => s.bounds(),
            Shape::Text(s) => s.bounds(),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        match self {
            Shape::Rectangle(s) => s.contains(point),
            Shape::Circle(s) => s.contains(point),
            Shape::Text(s) => s.contains(point),
        }
    }

    pub fn geometry(&self) -> Geometry {
        match self {
            Shape::Rectangle(s) => s.geometry(),
            Shape::Circle(s) => s.geometry(),
            Shape::Text(s) => s.geometry(),
        }
    }

    pub fn set_geometry(&mut self, geometry: Geometry) -> bool {
        match self {
            Shape::Rectangle(s) => s.set_geometry(geometry),
            Shape::Circle(s) => s.set_geometry(geometry),
            Shape::Text(s) => s.set_geometry(geometry),
        }
    }

    /// Move the shape by a delta.
    pub fn translate(&mut self, delta: Vec2) {
        let moved = self.geometry().translated(delta);
        self.set_geometry(moved);
    }

    pub fn selected_by(&self) -> &[UserId] {
        match self {
            Shape::Rectangle(s) => s.selected_by(),
            Shape::Circle(s) => s.selected_by(),
            Shape::Text(s) => s.selected_by(),
        }
    }

    pub fn selected_by_mut(&mut self) -> &mut Vec<UserId> {
        match self {
            Shape::Rectangle(s) => s.selected_by_mut(),
            Shape::Circle(s) => s.selected_by_mut(),
            Shape::Text(s) => s.selected_by_mut(),
        }
    }

    /// The user holding this shape's selection.
    ///
    /// Only the first entry counts; extra entries come from legacy data.
    pub fn owner(&self) -> Option<&str> {
        self.selected_by().first().map(String::as_str)
    }

    /// Check if `user` holds this shape's selection.
    pub fn is_selected_by(&self, user: &str) -> bool {
        self.owner() == Some(user)
    }

    /// Check if someone other than `user` holds this shape's selection.
    pub fn is_locked_for(&self, user: &str) -> bool {
        self.owner().is_some_and(|owner| owner != user)
    }

    /// Truncate `selected_by` to at most one entry.
    /// Returns true if anything was dropped.
    pub fn normalize_selection(&mut self) -> bool {
        let selected_by = self.selected_by_mut();
        if selected_by.len() > 1 {
            selected_by.truncate(1);
            true
        } else {
            false
        }
    }

    /// Get the text body if this shape is a text block.
    pub fn text(&self) -> Option<&str> {
        match self {
            Shape::Text(t) => Some(&t.text),
            _ => None,
        }
    }

    /// Replace the text body. Returns false for non-text shapes.
    pub fn set_text(&mut self, body: impl Into<String>) -> bool {
        match self {
            Shape::Text(t) => {
                t.text = body.into();
                true
            }
            _ => false,
        }
    }

    /// Check if this shape is a text block.
    pub fn is_text(&self) -> bool {
        matches!(self, Shape::Text(_))
    }
}
