//! Exclusive selection locks.
//!
//! Each shape is either unselected or selected by exactly one user, and a
//! user holds at most one selection. Selecting a shape is how a user takes
//! ownership of its mutable fields.

use crate::collection::ShapeCollection;
use crate::identity::UserId;
use crate::pipeline::Edit;
use crate::shapes::{Shape, ShapeId};
use kurbo::Point;

/// Lock state of a single shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState<'a> {
    Unselected,
    /// Held by this user. Legacy multi-owner data counts the first entry only.
    SelectedBy(&'a str),
}

impl<'a> LockState<'a> {
    /// Lock state of `shape`.
    pub fn of(shape: &'a Shape) -> Self {
        match shape.owner() {
            Some(owner) => LockState::SelectedBy(owner),
            None => LockState::Unselected,
        }
    }
}

/// What a select-tool click does.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Clicked a free shape: select it, releasing `previous` if held.
    Acquire {
        id: ShapeId,
        previous: Option<ShapeId>,
    },
    /// Clicked the shape the user already holds.
    Deselect(ShapeId),
    /// Clicked empty canvas while holding a selection.
    Release(ShapeId),
    /// Clicked a shape another user holds.
    Blocked { id: ShapeId, owner: UserId },
    /// Clicked empty canvas with nothing selected.
    Nothing,
}

impl ClickOutcome {
    /// The edits that carry out this outcome.
    pub fn edits(&self) -> Vec<Edit> {
        match self {
            ClickOutcome::Acquire { id, .. } => vec![Edit::Select(*id)],
            ClickOutcome::Deselect(id) => vec![Edit::Deselect(*id)],
            ClickOutcome::Release(_) => vec![Edit::Release],
            ClickOutcome::Blocked { .. } | ClickOutcome::Nothing => Vec::new(),
        }
    }
}

/// Resolve a select-tool click at `point` (canvas coordinates) for `user`.
///
/// The topmost shape under the pointer wins.
pub fn resolve_click(shapes: &ShapeCollection, user: &str, point: Point) -> ClickOutcome {
    let previous = shapes.selected_by(user);
    let Some(id) = shapes.topmost_at(point) else {
        return previous.map_or(ClickOutcome::Nothing, ClickOutcome::Release);
    };
    let Some(shape) = shapes.get(id) else {
        return ClickOutcome::Nothing;
    };

    match LockState::of(shape) {
        LockState::SelectedBy(owner) if owner == user => ClickOutcome::Deselect(id),
        LockState::SelectedBy(owner) => ClickOutcome::Blocked {
            id,
            owner: owner.to_string(),
        },
        LockState::Unselected => ClickOutcome::Acquire { id, previous },
    }
}
