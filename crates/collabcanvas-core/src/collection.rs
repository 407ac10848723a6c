//! The shape collection: the whole canvas, exchanged wholesale with the server.

use crate::error::DuplicateShapeId;
use crate::shapes::{Shape, ShapeId};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// All shapes on the canvas, keyed by ID, with a paint order.
///
/// On the wire this is a JSON array in paint order (back to front).
/// An array that repeats an ID fails to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Shape>", into = "Vec<Shape>")]
pub struct ShapeCollection {
    /// All shapes, keyed by ID.
    shapes: HashMap<ShapeId, Shape>,
    /// Paint order of shapes (back to front).
    z_order: Vec<ShapeId>,
}

impl ShapeCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from shapes in paint order.
    pub fn from_shapes(
        shapes: impl IntoIterator<Item = Shape>,
    ) -> Result<Self, DuplicateShapeId> {
        let mut collection = Self::new();
        for shape in shapes {
            collection.insert(shape)?;
        }
        Ok(collection)
    }

    /// Add a new shape on top. Fails if the ID is already present.
    pub fn insert(&mut self, shape: Shape) -> Result<(), DuplicateShapeId> {
        let id = shape.id();
        if self.shapes.contains_key(&id) {
            return Err(DuplicateShapeId(id));
        }
        self.z_order.push(id);
        self.shapes.insert(id, shape);
        Ok(())
    }

    /// Replace a shape in place, or add it on top if absent.
    pub fn upsert(&mut self, shape: Shape) {
        let id = shape.id();
        if self.shapes.insert(id, shape).is_none() {
            self.z_order.push(id);
        }
    }

    /// Get a shape by ID.
    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    /// Get a mutable reference to a shape by ID.
    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    /// Check if a shape exists.
    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    /// IDs in paint order (back to front).
    pub fn ids(&self) -> &[ShapeId] {
        &self.z_order
    }

    /// Shapes in paint order (back to front).
    pub fn shapes_ordered(&self) -> impl Iterator<Item = &Shape> {
        self.z_order.iter().filter_map(|id| self.shapes.get(id))
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Get the number of shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Find shapes containing a point (canvas coordinates), topmost first.
    pub fn shapes_at_point(&self, point: Point) -> Vec<ShapeId> {
        self.z_order
            .iter()
            .rev()
            .filter_map(|&id| {
                self.shapes
                    .get(&id)
                    .filter(|s| s.contains(point))
                    .map(|_| id)
            })
            .collect()
    }

    /// The topmost shape containing a point.
    pub fn topmost_at(&self, point: Point) -> Option<ShapeId> {
        self.z_order
            .iter()
            .rev()
            .copied()
            .find(|id| self.shapes.get(id).is_some_and(|s| s.contains(point)))
    }

    /// The shape currently selected by `user`, if any.
    ///
    /// Searches topmost first; a well-formed canvas has at most one.
    pub fn selected_by(&self, user: &str) -> Option<ShapeId> {
        self.z_order
            .iter()
            .rev()
            .copied()
            .find(|id| self.shapes.get(id).is_some_and(|s| s.is_selected_by(user)))
    }

    /// Truncate every multi-owner selection to its first entry.
    /// Returns the IDs that were changed.
    pub fn normalize_selections(&mut self) -> Vec<ShapeId> {
        let mut changed = Vec::new();
        for id in &self.z_order {
            if let Some(shape) = self.shapes.get_mut(id) {
                if shape.normalize_selection() {
                    changed.push(*id);
                }
            }
        }
        changed
    }

    /// A new collection holding only the given IDs, in this collection's order.
    pub fn subset(&self, ids: &HashSet<ShapeId>) -> Self {
        let z_order: Vec<ShapeId> = self
            .z_order
            .iter()
            .copied()
            .filter(|id| ids.contains(id))
            .collect();
        let shapes = z_order
            .iter()
            .filter_map(|id| self.shapes.get(id).map(|s| (*id, s.clone())))
            .collect();
        Self { shapes, z_order }
    }

    /// Get the bounding box of all shapes.
    pub fn bounds(&self) -> Option<Rect> {
        self.shapes_ordered()
            .map(Shape::bounds)
            .reduce(|acc, bounds| acc.union(bounds))
    }

    /// Serialize the collection to a JSON array.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a collection from a JSON array.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl TryFrom<Vec<Shape>> for ShapeCollection {
    type Error = DuplicateShapeId;

    fn try_from(shapes: Vec<Shape>) -> Result<Self, Self::Error> {
        Self::from_shapes(shapes)
    }
}

impl From<ShapeCollection> for Vec<Shape> {
    fn from(mut collection: ShapeCollection) -> Self {
        collection
            .z_order
            .iter()
            .filter_map(|id| collection.shapes.remove(id))
            .collect()
    }
}
