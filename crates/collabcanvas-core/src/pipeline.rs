//! Mutation pipeline: edits applied to the shape collection as one update.
//!
//! A batch is applied to a working copy of the collection; each edit either
//! applies fully or is rejected and skipped, and the resulting collection
//! replaces the old one in a single step. The IDs an edit touched make up
//! the subset that gets pushed to the server.

use crate::collection::ShapeCollection;
use crate::error::{EditError, EditResult};
use crate::handles::clamp_extent;
use crate::shapes::{Geometry, Shape, ShapeId};
use kurbo::{Point, Vec2};
use std::collections::HashSet;

/// Who issued an edit. Decides which selection rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditOrigin {
    /// The local user. Geometry and text edits need the local selection.
    Local,
    /// The external agent, acting as the local user. Refused only when
    /// another user holds the shape.
    Agent,
}

/// Rules a batch is applied under.
#[derive(Debug, Clone, Copy)]
pub struct EditPolicy<'a> {
    pub user: &'a str,
    pub origin: EditOrigin,
    pub min_extent: f64,
}

impl<'a> EditPolicy<'a> {
    pub fn local(user: &'a str, min_extent: f64) -> Self {
        Self {
            user,
            origin: EditOrigin::Local,
            min_extent,
        }
    }

    pub fn agent(user: &'a str, min_extent: f64) -> Self {
        Self {
            user,
            origin: EditOrigin::Agent,
            min_extent,
        }
    }
}

/// A single change to the collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Add a new shape on top.
    Create(Shape),
    /// Move a shape's anchor (top-left, or center for circles) to a point.
    Move { id: ShapeId, to: Point },
    /// Move a shape by a delta.
    Translate { id: ShapeId, delta: Vec2 },
    /// Overwrite position and extent.
    SetGeometry { id: ShapeId, geometry: Geometry },
    /// Change extents, keeping the anchor. Unset sizes keep their value.
    Resize {
        id: ShapeId,
        width: Option<f64>,
        height: Option<f64>,
        radius: Option<f64>,
    },
    /// Replace a text shape's body.
    SetText { id: ShapeId, text: String },
    /// Select a shape, releasing whatever the user held before.
    Select(ShapeId),
    /// Drop the user's selection of a shape.
    Deselect(ShapeId),
    /// Drop every selection the user holds.
    Release,
}

impl Edit {
    /// The shape this edit is aimed at, if any.
    pub fn target(&self) -> Option<ShapeId> {
        match self {
            Edit::Create(shape) => Some(shape.id()),
            Edit::Move { id, .. }
            | Edit::Translate { id, .. }
            | Edit::SetGeometry { id, .. }
            | Edit::Resize { id, .. }
            | Edit::SetText { id, .. }
            | Edit::Select(id)
            | Edit::Deselect(id) => Some(*id),
            Edit::Release => None,
        }
    }
}

/// Result of applying a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// The collection after every accepted edit.
    pub shapes: ShapeCollection,
    /// Shapes that changed, in the order they were first touched.
    pub changed: Vec<ShapeId>,
    /// Edits that were refused.
    pub rejected: Vec<EditError>,
}

impl BatchOutcome {
    pub fn changed_set(&self) -> HashSet<ShapeId> {
        self.changed.iter().copied().collect()
    }

    /// The changed shapes as they now stand: the push payload.
    pub fn changed_subset(&self) -> ShapeCollection {
        self.shapes.subset(&self.changed_set())
    }
}

/// Apply `edits` in order to a copy of `shapes`.
///
/// Refused edits are collected in [`BatchOutcome::rejected`] and leave the
/// working copy untouched; the rest of the batch still applies.
pub fn apply_batch(
    shapes: &ShapeCollection,
    edits: impl IntoIterator<Item = Edit>,
    policy: &EditPolicy<'_>,
) -> BatchOutcome {
    let mut working = shapes.clone();
    let mut changed: Vec<ShapeId> = Vec::new();
    let mut rejected = Vec::new();

    for edit in edits {
        match apply_edit(&mut working, edit, policy) {
            Ok(touched) => {
                for id in touched {
                    if !changed.contains(&id) {
                        changed.push(id);
                    }
                }
            }
            Err(err) => rejected.push(err),
        }
    }

    BatchOutcome {
        shapes: working,
        changed,
        rejected,
    }
}

/// Apply one edit in place. Returns the IDs it changed.
///
/// On error the collection is left as it was.
pub fn apply_edit(
    shapes: &mut ShapeCollection,
    edit: Edit,
    policy: &EditPolicy<'_>,
) -> EditResult<Vec<ShapeId>> {
    let user = policy.user;
    match edit {
        Edit::Create(shape) => {
            let id = shape.id();
            shapes
                .insert(shape)
                .map_err(|_| EditError::DuplicateId(id))?;
            Ok(vec![id])
        }
        Edit::Move { id, to } => {
            let shape = writable(shapes, id, policy)?;
            let geometry = shape.geometry().with_anchor(to);
            Ok(set_geometry(shape, id, geometry))
        }
        Edit::Translate { id, delta } => {
            let shape = writable(shapes, id, policy)?;
            let geometry = shape.geometry().translated(delta);
            Ok(set_geometry(shape, id, geometry))
        }
        Edit::SetGeometry { id, geometry } => {
            let shape = writable(shapes, id, policy)?;
            Ok(set_geometry(shape, id, geometry))
        }
        Edit::Resize {
            id,
            width,
            height,
            radius,
        } => {
            let shape = writable(shapes, id, policy)?;
            let geometry = resized(shape.geometry(), width, height, radius, policy.min_extent);
            Ok(set_geometry(shape, id, geometry))
        }
        Edit::SetText { id, text } => {
            let shape = writable(shapes, id, policy)?;
            if !shape.is_text() {
                return Err(EditError::NotText(id));
            }
            if shape.text() == Some(text.as_str()) {
                return Ok(Vec::new());
            }
            shape.set_text(text);
            Ok(vec![id])
        }
        Edit::Select(id) => select(shapes, id, user),
        Edit::Deselect(id) => {
            let shape = shapes.get_mut(id).ok_or(EditError::UnknownShape(id))?;
            if !shape.selected_by().iter().any(|u| u == user) {
                return Err(EditError::NotSelected(id));
            }
            shape.selected_by_mut().retain(|u| u != user);
            Ok(vec![id])
        }
        Edit::Release => Ok(release(shapes, user, None)),
    }
}

/// Look up a shape the policy allows writing to.
fn writable<'s>(
    shapes: &'s mut ShapeCollection,
    id: ShapeId,
    policy: &EditPolicy<'_>,
) -> EditResult<&'s mut Shape> {
    let shape = shapes.get_mut(id).ok_or(EditError::UnknownShape(id))?;
    let user = policy.user;

    if let Some(owner) = shape.owner() {
        if owner != user {
            return Err(EditError::SelectionConflict {
                id,
                owner: owner.to_string(),
            });
        }
    } else if policy.origin == EditOrigin::Local {
        return Err(EditError::NotSelected(id));
    }
    Ok(shape)
}

fn set_geometry(shape: &mut Shape, id: ShapeId, geometry: Geometry) -> Vec<ShapeId> {
    if shape.geometry() == geometry || !shape.set_geometry(geometry) {
        Vec::new()
    } else {
        vec![id]
    }
}

fn resized(
    current: Geometry,
    width: Option<f64>,
    height: Option<f64>,
    radius: Option<f64>,
    min_extent: f64,
) -> Geometry {
    let geometry = match current {
        Geometry::Boxed {
            position,
            width: w,
            height: h,
        } => Geometry::Boxed {
            position,
            width: width.or(radius.map(|r| r * 2.0)).unwrap_or(w),
            height: height.or(radius.map(|r| r * 2.0)).unwrap_or(h),
        },
        Geometry::Round { center, radius: r } => {
            let from_box = match (width, height) {
                (Some(w), Some(h)) => Some(w.max(h) / 2.0),
                (Some(side), None) | (None, Some(side)) => Some(side / 2.0),
                (None, None) => None,
            };
            Geometry::Round {
                center,
                radius: radius.or(from_box).unwrap_or(r),
            }
        }
    };
    clamp_extent(geometry, min_extent)
}

fn select(shapes: &mut ShapeCollection, id: ShapeId, user: &str) -> EditResult<Vec<ShapeId>> {
    let shape = shapes.get(id).ok_or(EditError::UnknownShape(id))?;
    if shape.is_locked_for(user) {
        return Err(EditError::SelectionConflict {
            id,
            owner: shape.owner().unwrap_or_default().to_string(),
        });
    }
    if shape.selected_by().len() == 1 && shape.is_selected_by(user) {
        return Ok(Vec::new());
    }

    let mut changed = release(shapes, user, Some(id));
    if let Some(shape) = shapes.get_mut(id) {
        *shape.selected_by_mut() = vec![user.to_string()];
        changed.push(id);
    }
    Ok(changed)
}

/// Remove `user` from every selection except `keep`. Returns changed IDs.
fn release(shapes: &mut ShapeCollection, user: &str, keep: Option<ShapeId>) -> Vec<ShapeId> {
    let held: Vec<ShapeId> = shapes
        .ids()
        .iter()
        .copied()
        .filter(|&id| Some(id) != keep)
        .filter(|&id| {
            shapes
                .get(id)
                .is_some_and(|s| s.selected_by().iter().any(|u| u == user))
        })
        .collect();

    for &id in &held {
        if let Some(shape) = shapes.get_mut(id) {
            shape.selected_by_mut().retain(|u| u != user);
        }
    }
    held
}
