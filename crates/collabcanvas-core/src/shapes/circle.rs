//! Circle shape.

use super::{Geometry, ShapeId, ShapeTrait};
use crate::identity::UserId;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A circle, anchored at its center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub(crate) id: ShapeId,
    /// Center point.
    #[serde(flatten)]
    pub center: Point,
    /// Radius.
    pub radius: f64,
    /// Users selecting this shape (at most one at steady state).
    #[serde(rename = "selectedBy", default)]
    pub selected_by: Vec<UserId>,
}

impl Circle {
    /// Create a new circle.
    pub fn new(center: Point, radius: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            center,
            radius,
            selected_by: Vec::new(),
        }
    }

    /// Replace the generated identifier (for data that already has one).
    pub fn with_id(mut self, id: ShapeId) -> Self {
        self.id = id;
        self
    }
}

impl ShapeTrait for Circle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.center.x + self.radius,
            self.center.y + self.radius,
        )
    }

    fn contains(&self, point: Point) -> bool {
        self.center.distance(point) <= self.radius
    }

    fn geometry(&self) -> Geometry {
        Geometry::Round {
            center: self.center,
            radius: self.radius,
        }
    }

    fn set_geometry(&mut self, geometry: Geometry) -> bool {
        match geometry {
            Geometry::Round { center, radius } => {
                self.center = center;
                self.radius = radius;
                true
            }
            Geometry::Boxed { .. } => false,
        }
    }

    fn selected_by(&self) -> &[UserId] {
        &self.selected_by
    }

    fn selected_by_mut(&mut self) -> &mut Vec<UserId> {
        &mut self.selected_by
    }
}
