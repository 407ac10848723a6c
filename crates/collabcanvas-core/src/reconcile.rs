//! Field-level reconciliation of local and server shape collections.
//!
//! The server is the starting point for every shape both sides know. The
//! local client is authoritative for the fields it currently owns: geometry
//! of the shape it has selected, the body of the text it is editing, and
//! anything it has written but not yet seen acknowledged.

use crate::collection::ShapeCollection;
use crate::identity::UserId;
use crate::shapes::{Shape, ShapeId};
use std::collections::HashSet;

/// What the local client currently owns, beyond its selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeContext {
    /// The local identity.
    pub identity: UserId,
    /// Text shape in local text-edit mode.
    pub editing_text: Option<ShapeId>,
    /// Shapes written locally whose push has not been acknowledged.
    pub claimed: HashSet<ShapeId>,
}

impl MergeContext {
    pub fn new(identity: impl Into<UserId>) -> Self {
        Self {
            identity: identity.into(),
            ..Self::default()
        }
    }

    pub fn with_editing_text(mut self, id: Option<ShapeId>) -> Self {
        self.editing_text = id;
        self
    }

    pub fn with_claims(mut self, claimed: impl IntoIterator<Item = ShapeId>) -> Self {
        self.claimed = claimed.into_iter().collect();
        self
    }
}

/// Result of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub shapes: ShapeCollection,
    /// IDs that are a different kind of shape locally and on the server.
    /// The server version was kept.
    pub kind_conflicts: Vec<ShapeId>,
}

/// Merge `local` against `server` for the local identity in `ctx`.
///
/// Paint order is the server's, followed by local-only shapes in local order.
/// Every merged `selected_by` has at most one entry.
pub fn merge(local: &ShapeCollection, server: &ShapeCollection, ctx: &MergeContext) -> Merged {
    let mut shapes = ShapeCollection::new();
    let mut kind_conflicts = Vec::new();

    for server_shape in server.shapes_ordered() {
        let merged = match local.get(server_shape.id()) {
            Some(local_shape) => {
                if local_shape.kind() != server_shape.kind() {
                    kind_conflicts.push(server_shape.id());
                    adopt_shape(server_shape)
                } else {
                    merge_shape(local_shape, server_shape, ctx)
                }
            }
            None => adopt_shape(server_shape),
        };
        shapes.upsert(merged);
    }

    for local_shape in local.shapes_ordered() {
        if !server.contains(local_shape.id()) {
            shapes.upsert(adopt_shape(local_shape));
        }
    }

    Merged {
        shapes,
        kind_conflicts,
    }
}

/// Take the server collection wholesale (initial load, reset, empty local).
pub fn adopt(server: &ShapeCollection) -> ShapeCollection {
    let mut shapes = server.clone();
    shapes.normalize_selections();
    shapes
}

fn adopt_shape(source: &Shape) -> Shape {
    let mut shape = source.clone();
    shape.normalize_selection();
    shape
}

/// Merge one shape present on both sides. Both must be the same kind.
fn merge_shape(local: &Shape, server: &Shape, ctx: &MergeContext) -> Shape {
    let id = server.id();
    let me = ctx.identity.as_str();
    let claimed = ctx.claimed.contains(&id);
    let local_owns = local.selected_by().iter().any(|u| u == me);

    let mut merged = server.clone();

    if local_owns {
        *merged.selected_by_mut() = vec![me.to_string()];
        merged.set_geometry(local.geometry());
    } else {
        if claimed && server.is_selected_by(me) {
            // A release still in flight: the stale server entry loses.
            *merged.selected_by_mut() = local.selected_by().to_vec();
        }
        merged.normalize_selection();
        if claimed {
            merged.set_geometry(local.geometry());
        }
    }

    if merged.is_text() && (claimed || ctx.editing_text == Some(id)) {
        if let Some(body) = local.text() {
            merged.set_text(body);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Circle, Geometry, Rectangle, Text};
    use kurbo::Point;

    fn rect_with_id(id: ShapeId, x: f64, y: f64, owners: &[&str]) -> Shape {
        let mut rect = Rectangle::new(Point::new(x, y), 20.0, 20.0).with_id(id);
        rect.selected_by = owners.iter().map(|s| s.to_string()).collect();
        Shape::Rectangle(rect)
    }

    fn collection(shapes: impl IntoIterator<Item = Shape>) -> ShapeCollection {
        ShapeCollection::from_shapes(shapes).unwrap()
    }

    #[test]
    fn test_local_selection_wins() {
        let id = ShapeId::new_v4();
        let local = collection([rect_with_id(id, 10.0, 10.0, &["alice"])]);
        let server = collection([rect_with_id(id, 50.0, 50.0, &["bob"])]);

        let merged = merge(&local, &server, &MergeContext::new("alice")).shapes;
        let shape = merged.get(id).unwrap();
        assert_eq!(shape.selected_by(), ["alice".to_string()]);
        assert_eq!(shape.geometry().anchor(), Point::new(10.0, 10.0));
    }

    #[test]
    fn test_server_wins_without_ownership() {
        let id = ShapeId::new_v4();
        let local = collection([rect_with_id(id, 10.0, 10.0, &[])]);
        let server = collection([rect_with_id(id, 50.0, 50.0, &["bob", "carol"])]);

        let merged = merge(&local, &server, &MergeContext::new("alice")).shapes;
        let shape = merged.get(id).unwrap();
        assert_eq!(shape.selected_by(), ["bob".to_string()]);
        assert_eq!(shape.geometry().anchor(), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_empty_local_adopts_server() {
        let a = rect_with_id(ShapeId::new_v4(), 0.0, 0.0, &[]);
        let b = rect_with_id(ShapeId::new_v4(), 5.0, 5.0, &["bob"]);
        let server = collection([a, b]);

        let merged = merge(&ShapeCollection::new(), &server, &MergeContext::new("alice")).shapes;
        assert_eq!(merged, server);
        assert_eq!(adopt(&server), server);
    }

    #[test]
    fn test_idempotent() {
        let shapes = collection([
            rect_with_id(ShapeId::new_v4(), 0.0, 0.0, &["alice"]),
            rect_with_id(ShapeId::new_v4(), 5.0, 5.0, &["bob"]),
            rect_with_id(ShapeId::new_v4(), 9.0, 9.0, &[]),
        ]);
        let ctx = MergeContext::new("alice");
        assert_eq!(merge(&shapes, &shapes, &ctx).shapes, shapes);
    }

    #[test]
    fn test_local_only_survives_and_order() {
        let shared = ShapeId::new_v4();
        let server_only = ShapeId::new_v4();
        let local_only = ShapeId::new_v4();
        let local = collection([
            rect_with_id(local_only, 1.0, 1.0, &[]),
            rect_with_id(shared, 2.0, 2.0, &[]),
        ]);
        let server = collection([
            rect_with_id(shared, 2.0, 2.0, &[]),
            rect_with_id(server_only, 3.0, 3.0, &[]),
        ]);

        let merged = merge(&local, &server, &MergeContext::new("alice")).shapes;
        assert_eq!(merged.ids(), &[shared, server_only, local_only]);
        assert_eq!(merged.get(local_only), local.get(local_only));
    }

    #[test]
    fn test_editing_text_keeps_local_body() {
        let id = ShapeId::new_v4();
        let mut local_text = Text::new(Point::ZERO, 200.0, 50.0, "typing").with_id(id);
        local_text.selected_by = vec!["alice".into()];
        let mut server_text = Text::new(Point::ZERO, 200.0, 50.0, "old").with_id(id);
        server_text.selected_by = vec!["alice".into()];
        let local = collection([Shape::Text(local_text)]);
        let server = collection([Shape::Text(server_text)]);

        let ctx = MergeContext::new("alice");
        let plain = merge(&local, &server, &ctx).shapes;
        assert_eq!(plain.get(id).unwrap().text(), Some("old"));

        let editing = merge(&local, &server, &ctx.with_editing_text(Some(id))).shapes;
        assert_eq!(editing.get(id).unwrap().text(), Some("typing"));
    }

    #[test]
    fn test_claimed_shape_keeps_local_geometry() {
        let id = ShapeId::new_v4();
        let local = collection([rect_with_id(id, 80.0, 80.0, &[])]);
        let server = collection([rect_with_id(id, 0.0, 0.0, &[])]);

        let ctx = MergeContext::new("alice").with_claims([id]);
        let merged = merge(&local, &server, &ctx).shapes;
        assert_eq!(merged.get(id).unwrap().geometry().anchor(), Point::new(80.0, 80.0));
    }

    #[test]
    fn test_claimed_release_not_undone() {
        let id = ShapeId::new_v4();
        let local = collection([rect_with_id(id, 0.0, 0.0, &[])]);
        let server = collection([rect_with_id(id, 0.0, 0.0, &["alice"])]);

        let unclaimed = merge(&local, &server, &MergeContext::new("alice")).shapes;
        assert!(unclaimed.get(id).unwrap().is_selected_by("alice"));

        let ctx = MergeContext::new("alice").with_claims([id]);
        let claimed = merge(&local, &server, &ctx).shapes;
        assert!(claimed.get(id).unwrap().selected_by().is_empty());
    }

    #[test]
    fn test_kind_conflict_takes_server() {
        let id = ShapeId::new_v4();
        let local = collection([rect_with_id(id, 0.0, 0.0, &["alice"])]);
        let mut circle = Circle::new(Point::new(5.0, 5.0), 5.0).with_id(id);
        circle.selected_by = vec!["bob".into(), "carol".into()];
        let server = collection([Shape::Circle(circle)]);

        let merged = merge(&local, &server, &MergeContext::new("alice"));
        assert_eq!(merged.kind_conflicts, vec![id]);
        let shape = merged.shapes.get(id).unwrap();
        assert!(matches!(shape.geometry(), Geometry::Round { .. }));
        assert_eq!(shape.selected_by(), ["bob".to_string()]);
    }

    #[test]
    fn test_single_owner_after_merge() {
        let ids: Vec<ShapeId> = (0..4).map(|_| ShapeId::new_v4()).collect();
        let local = collection([
            rect_with_id(ids[0], 0.0, 0.0, &["alice", "bob"]),
            rect_with_id(ids[1], 0.0, 0.0, &[]),
            rect_with_id(ids[3], 0.0, 0.0, &["x", "y"]),
        ]);
        let server = collection([
            rect_with_id(ids[0], 0.0, 0.0, &["bob", "alice"]),
            rect_with_id(ids[1], 0.0, 0.0, &["bob", "carol"]),
            rect_with_id(ids[2], 0.0, 0.0, &["dave", "erin"]),
        ]);

        let merged = merge(&local, &server, &MergeContext::new("alice")).shapes;
        for shape in merged.shapes_ordered() {
            assert!(shape.selected_by().len() <= 1, "{:?}", shape.selected_by());
        }
        assert!(merged.get(ids[0]).unwrap().is_selected_by("alice"));
    }
}
