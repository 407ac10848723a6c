//! Interaction state machine.
//!
//! Consumes pointer and keyboard input plus the current collection and
//! returns [`Effect`]s for the engine to carry out. Nothing here touches the
//! network or mutates shapes directly.

use crate::collection::ShapeCollection;
use crate::config::{EngineConfig, PlacementDefaults};
use crate::handles::{HandleKind, hit_test_handles, resize};
use crate::identity::UserId;
use crate::pipeline::Edit;
use crate::selection::{ClickOutcome, LockState, resolve_click};
use crate::shapes::{Geometry, ShapeId, ShapeKind};
use crate::viewport::Viewport;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Tools that can be armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Select,
    Rectangle,
    Circle,
    Text,
}

impl ToolKind {
    /// The shape a placement tool creates; `None` for the select tool.
    pub fn placement(self) -> Option<ShapeKind> {
        match self {
            ToolKind::Select => None,
            ToolKind::Rectangle => Some(ShapeKind::Rectangle),
            ToolKind::Circle => Some(ShapeKind::Circle),
            ToolKind::Text => Some(ShapeKind::Text),
        }
    }
}

/// Observable interaction state. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Panning,
    ToolArmed(ToolKind),
    Dragging(ShapeId),
    Resizing(ShapeId, HandleKind),
    EditingText(ShapeId),
}

/// In-progress gesture with its start snapshot.
#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    None,
    Panning {
        last_screen: Point,
    },
    Dragging {
        id: ShapeId,
        start: Geometry,
        pointer_start: Point,
        /// The pointer-down that started this drag also selected the shape.
        just_selected: bool,
        moved: bool,
    },
    Resizing {
        id: ShapeId,
        handle: HandleKind,
        start: Geometry,
        pointer_start: Point,
    },
    EditingText {
        id: ShapeId,
    },
}

/// Work for the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Apply locally only (drag and resize previews, typing).
    Preview(Edit),
    /// Apply and push.
    Commit(Vec<Edit>),
    /// End of a drag or resize: set the final geometry and push the shape,
    /// even when previews already brought local state to it.
    CommitGesture { id: ShapeId, geometry: Geometry },
    /// Push the text being edited; clear edit mode once acknowledged.
    CommitText(ShapeId),
    /// A selection conflict turned the input into a no-op.
    Blocked { id: ShapeId, owner: UserId },
}

#[derive(Debug, Clone, PartialEq)]
struct Settings {
    min_extent: f64,
    handle_tolerance: f64,
    placement: PlacementDefaults,
}

/// Client-local interaction session: armed tool, move mode, gesture and
/// viewport.
#[derive(Debug, Clone)]
pub struct InteractionSession {
    identity: UserId,
    armed: Option<ToolKind>,
    move_mode: bool,
    gesture: Gesture,
    pub viewport: Viewport,
    settings: Settings,
}

impl InteractionSession {
    pub fn new(identity: impl Into<UserId>, config: &EngineConfig) -> Self {
        Self {
            identity: identity.into(),
            armed: None,
            move_mode: false,
            gesture: Gesture::None,
            viewport: Viewport::with_limits(config.min_zoom, config.max_zoom),
            settings: Settings {
                min_extent: config.min_extent,
                handle_tolerance: config.handle_tolerance,
                placement: config.placement.clone(),
            },
        }
    }

    pub fn state(&self) -> InteractionState {
        match &self.gesture {
            Gesture::Panning { .. } => InteractionState::Panning,
            Gesture::Dragging { id, .. } => InteractionState::Dragging(*id),
            Gesture::Resizing { id, handle, .. } => InteractionState::Resizing(*id, *handle),
            Gesture::EditingText { id } => InteractionState::EditingText(*id),
            Gesture::None => match self.armed {
                Some(tool) => InteractionState::ToolArmed(tool),
                None => InteractionState::Idle,
            },
        }
    }

    pub fn armed_tool(&self) -> Option<ToolKind> {
        self.armed
    }

    pub fn move_mode(&self) -> bool {
        self.move_mode
    }

    /// The text shape in edit mode, if any.
    pub fn editing_text(&self) -> Option<ShapeId> {
        match self.gesture {
            Gesture::EditingText { id } => Some(id),
            _ => None,
        }
    }

    /// Arm `tool`, or disarm it if it is already armed.
    ///
    /// Arming a placement tool turns move mode off. Any gesture in progress
    /// ends; text being edited is committed.
    pub fn toggle_tool(&mut self, tool: ToolKind) -> Vec<Effect> {
        let effects = self.leave_gesture();
        if self.armed == Some(tool) {
            self.armed = None;
        } else {
            self.armed = Some(tool);
            if tool.placement().is_some() {
                self.move_mode = false;
            }
        }
        effects
    }

    /// Toggle move mode. Enabling it disarms placement tools.
    pub fn toggle_move_mode(&mut self) {
        self.move_mode = !self.move_mode;
        if self.move_mode && self.armed.and_then(ToolKind::placement).is_some() {
            self.armed = None;
        }
    }

    /// Disarm tools and leave move mode. No network effect.
    pub fn escape(&mut self) {
        self.armed = None;
        self.move_mode = false;
    }

    pub fn pointer_down(&mut self, screen: Point, shapes: &ShapeCollection) -> Vec<Effect> {
        let mut effects = self.leave_gesture();
        let point = self.viewport.screen_to_canvas(screen);

        if let Some(kind) = self.armed.and_then(ToolKind::placement) {
            let shape = self.settings.placement.shape(kind, point);
            effects.push(Effect::Commit(vec![Edit::Create(shape)]));
            return effects;
        }

        if let Some(gesture) = self.resize_gesture(point, shapes) {
            self.gesture = gesture;
            return effects;
        }

        let hit = shapes.topmost_at(point);
        let can_drag = self.armed == Some(ToolKind::Select) || self.move_mode;
        if can_drag {
            if let Some(shape) = hit.and_then(|id| shapes.get(id)) {
                if shape.is_selected_by(&self.identity) {
                    self.gesture = Gesture::Dragging {
                        id: shape.id(),
                        start: shape.geometry(),
                        pointer_start: point,
                        just_selected: false,
                        moved: false,
                    };
                    return effects;
                }
            }
        }

        if self.armed == Some(ToolKind::Select) {
            let outcome = resolve_click(shapes, &self.identity, point);
            let edits = outcome.edits();
            match outcome {
                ClickOutcome::Acquire { id, .. } => {
                    if let Some(shape) = shapes.get(id) {
                        self.gesture = Gesture::Dragging {
                            id,
                            start: shape.geometry(),
                            pointer_start: point,
                            just_selected: true,
                            moved: false,
                        };
                    }
                }
                ClickOutcome::Blocked { id, owner } => {
                    effects.push(Effect::Blocked { id, owner });
                }
                ClickOutcome::Release(_) | ClickOutcome::Nothing => {
                    self.gesture = Gesture::Panning {
                        last_screen: screen,
                    };
                }
                ClickOutcome::Deselect(_) => {}
            }
            if !edits.is_empty() {
                effects.push(Effect::Commit(edits));
            }
            return effects;
        }

        self.gesture = Gesture::Panning {
            last_screen: screen,
        };
        effects
    }

    pub fn pointer_move(&mut self, screen: Point) -> Vec<Effect> {
        let point = self.viewport.screen_to_canvas(screen);
        let min_extent = self.settings.min_extent;

        match &mut self.gesture {
            Gesture::Panning { last_screen } => {
                let delta = screen - *last_screen;
                *last_screen = screen;
                self.viewport.pan_by(delta);
                Vec::new()
            }
            Gesture::Dragging {
                id,
                start,
                pointer_start,
                moved,
                ..
            } => {
                let delta = point - *pointer_start;
                if delta != Vec2::ZERO {
                    *moved = true;
                }
                vec![Effect::Preview(Edit::SetGeometry {
                    id: *id,
                    geometry: start.translated(delta),
                })]
            }
            Gesture::Resizing {
                id,
                handle,
                start,
                pointer_start,
            } => {
                let delta = point - *pointer_start;
                vec![Effect::Preview(Edit::SetGeometry {
                    id: *id,
                    geometry: resize(*start, *handle, delta, min_extent),
                })]
            }
            Gesture::None | Gesture::EditingText { .. } => Vec::new(),
        }
    }

    pub fn pointer_up(&mut self, screen: Point) -> Vec<Effect> {
        let point = self.viewport.screen_to_canvas(screen);
        let min_extent = self.settings.min_extent;

        let effects = match &self.gesture {
            Gesture::Dragging {
                id,
                start,
                pointer_start,
                just_selected,
                moved,
            } => {
                let delta = point - *pointer_start;
                if *moved || delta != Vec2::ZERO {
                    vec![Effect::CommitGesture {
                        id: *id,
                        geometry: start.translated(delta),
                    }]
                } else if !*just_selected && self.armed == Some(ToolKind::Select) {
                    // A plain click on the held shape releases it.
                    vec![Effect::Commit(vec![Edit::Deselect(*id)])]
                } else {
                    Vec::new()
                }
            }
            Gesture::Resizing {
                id,
                handle,
                start,
                pointer_start,
            } => {
                let delta = point - *pointer_start;
                vec![Effect::CommitGesture {
                    id: *id,
                    geometry: resize(*start, *handle, delta, min_extent),
                }]
            }
            Gesture::EditingText { .. } => return Vec::new(),
            Gesture::None | Gesture::Panning { .. } => Vec::new(),
        };

        self.gesture = Gesture::None;
        effects
    }

    /// Double-click: enter text edit mode on a text shape.
    pub fn double_click(&mut self, screen: Point, shapes: &ShapeCollection) -> Vec<Effect> {
        let point = self.viewport.screen_to_canvas(screen);
        let Some(shape) = shapes.topmost_at(point).and_then(|id| shapes.get(id)) else {
            return Vec::new();
        };
        if !shape.is_text() {
            return Vec::new();
        }
        let id = shape.id();
        if self.editing_text() == Some(id) {
            return Vec::new();
        }

        let mut effects = self.leave_gesture();
        match LockState::of(shape) {
            LockState::SelectedBy(owner) if owner != self.identity => {
                effects.push(Effect::Blocked {
                    id,
                    owner: owner.to_string(),
                });
                return effects;
            }
            LockState::SelectedBy(_) => {}
            LockState::Unselected => effects.push(Effect::Commit(vec![Edit::Select(id)])),
        }

        self.move_mode = false;
        self.gesture = Gesture::EditingText { id };
        effects
    }

    /// Replace the body of the text being edited (local preview).
    pub fn type_text(&self, body: impl Into<String>) -> Option<Effect> {
        self.editing_text().map(|id| {
            Effect::Preview(Edit::SetText {
                id,
                text: body.into(),
            })
        })
    }

    /// Leave text edit mode. The edit state stays until
    /// [`InteractionSession::clear_text_edit`] is called on acknowledgment.
    pub fn finish_text_edit(&self) -> Option<Effect> {
        self.editing_text().map(Effect::CommitText)
    }

    /// Drop the edit state for `id` if it is still the one being edited.
    pub fn clear_text_edit(&mut self, id: ShapeId) {
        if self.editing_text() == Some(id) {
            self.gesture = Gesture::None;
        }
    }

    /// End whatever gesture is in progress. Text edits are committed; drags
    /// and resizes are abandoned.
    fn leave_gesture(&mut self) -> Vec<Effect> {
        match self.gesture {
            Gesture::EditingText { id } => vec![Effect::CommitText(id)],
            Gesture::None => Vec::new(),
            _ => {
                self.gesture = Gesture::None;
                Vec::new()
            }
        }
    }

    fn resize_gesture(&self, point: Point, shapes: &ShapeCollection) -> Option<Gesture> {
        let id = shapes.selected_by(&self.identity)?;
        let shape = shapes.get(id)?;
        let handle = hit_test_handles(
            shape,
            point,
            self.settings.handle_tolerance,
            self.viewport.zoom,
        )?;
        Some(Gesture::Resizing {
            id,
            handle,
            start: shape.geometry(),
            pointer_start: point,
        })
    }
}
