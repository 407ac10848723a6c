//! Agent commands: validation and translation into pipeline edits.

use crate::config::PlacementDefaults;
use crate::error::CommandError;
use crate::handles::clamp_extent;
use crate::pipeline::Edit;
use crate::shapes::{Circle, Rectangle, Shape, ShapeId, ShapeKind, Text};
use crate::wire::AiCommand;
use kurbo::Point;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Actions the engine knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    CreateShape,
    MoveShape,
    ResizeShape,
    UpdateText,
}

impl CommandKind {
    /// Look up an action name.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "createShape" => Some(CommandKind::CreateShape),
            "moveShape" => Some(CommandKind::MoveShape),
            "resizeShape" => Some(CommandKind::ResizeShape),
            "updateText" => Some(CommandKind::UpdateText),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateParams {
    #[serde(rename = "type")]
    kind: ShapeKind,
    x: f64,
    y: f64,
    width: Option<f64>,
    height: Option<f64>,
    radius: Option<f64>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveParams {
    shape_id: ShapeId,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResizeParams {
    shape_id: ShapeId,
    width: Option<f64>,
    height: Option<f64>,
    radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTextParams {
    shape_id: ShapeId,
    text: String,
}

/// Translate one agent command into an edit. Created shapes are clamped to
/// `min_extent` like resized ones.
pub fn to_edit(
    command: &AiCommand,
    placement: &PlacementDefaults,
    min_extent: f64,
) -> Result<Edit, CommandError> {
    let kind = CommandKind::from_action(&command.action)
        .ok_or_else(|| CommandError::Unsupported(command.action.clone()))?;

    match kind {
        CommandKind::CreateShape => {
            let params: CreateParams = params(command)?;
            for size in [params.width, params.height, params.radius].into_iter().flatten() {
                positive(command, size)?;
            }
            let mut shape = create_shape(params, placement);
            shape.set_geometry(clamp_extent(shape.geometry(), min_extent));
            Ok(Edit::Create(shape))
        }
        CommandKind::MoveShape => {
            let params: MoveParams = params(command)?;
            Ok(Edit::Move {
                id: params.shape_id,
                to: Point::new(params.x, params.y),
            })
        }
        CommandKind::ResizeShape => {
            let params: ResizeParams = params(command)?;
            if params.width.is_none() && params.height.is_none() && params.radius.is_none() {
                return Err(invalid(command, "expected width, height or radius"));
            }
            for size in [params.width, params.height, params.radius].into_iter().flatten() {
                positive(command, size)?;
            }
            Ok(Edit::Resize {
                id: params.shape_id,
                width: params.width,
                height: params.height,
                radius: params.radius,
            })
        }
        CommandKind::UpdateText => {
            let params: UpdateTextParams = params(command)?;
            Ok(Edit::SetText {
                id: params.shape_id,
                text: params.text,
            })
        }
    }
}

/// Translate a batch, keeping the valid subset.
///
/// Returns the edits in command order and the errors for skipped commands.
pub fn to_edits(
    commands: &[AiCommand],
    placement: &PlacementDefaults,
    min_extent: f64,
) -> (Vec<Edit>, Vec<CommandError>) {
    let mut edits = Vec::new();
    let mut skipped = Vec::new();
    for command in commands {
        match to_edit(command, placement, min_extent) {
            Ok(edit) => edits.push(edit),
            Err(err) => skipped.push(err),
        }
    }
    (edits, skipped)
}

fn create_shape(params: CreateParams, placement: &PlacementDefaults) -> Shape {
    let point = Point::new(params.x, params.y);
    match params.kind {
        ShapeKind::Rectangle => Shape::Rectangle(Rectangle::new(
            point,
            params.width.unwrap_or(placement.rectangle_width),
            params.height.unwrap_or(placement.rectangle_height),
        )),
        ShapeKind::Circle => {
            let from_box = match (params.width, params.height) {
                (Some(w), Some(h)) => Some(w.max(h) / 2.0),
                (Some(side), None) | (None, Some(side)) => Some(side / 2.0),
                (None, None) => None,
            };
            let radius = params
                .radius
                .or(from_box)
                .unwrap_or(placement.circle_radius);
            Shape::Circle(Circle::new(point, radius))
        }
        ShapeKind::Text => Shape::Text(Text::new(
            point,
            params.width.unwrap_or(placement.text_width),
            params.height.unwrap_or(placement.text_height),
            params.text.unwrap_or_else(|| placement.text_body.clone()),
        )),
    }
}

fn params<T: DeserializeOwned>(command: &AiCommand) -> Result<T, CommandError> {
    serde_json::from_value(command.params.clone()).map_err(|e| invalid(command, e.to_string()))
}

fn positive(command: &AiCommand, size: f64) -> Result<(), CommandError> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(invalid(command, format!("size must be positive, got {size}")))
    }
}

fn invalid(command: &AiCommand, reason: impl Into<String>) -> CommandError {
    CommandError::InvalidParams {
        action: command.action.clone(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::DEFAULT_MIN_EXTENT;
    use crate::shapes::Geometry;
    use serde_json::json;

    fn placement() -> PlacementDefaults {
        PlacementDefaults::default()
    }

    #[test]
    fn test_create_rectangle_defaults() {
        let command = AiCommand::new("createShape", json!({"type": "rectangle", "x": 10, "y": 20}));
        let Ok(Edit::Create(shape)) = to_edit(&command, &placement(), DEFAULT_MIN_EXTENT) else {
            panic!("expected a create edit");
        };
        assert_eq!(
            shape.geometry(),
            Geometry::Boxed {
                position: Point::new(10.0, 20.0),
                width: 100.0,
                height: 100.0
            }
        );
        assert!(shape.selected_by().is_empty());
    }

    #[test]
    fn test_create_text_and_circle() {
        let text = AiCommand::new("createShape", json!({"type": "text", "x": 0, "y": 0, "text": "hi"}));
        let Ok(Edit::Create(shape)) = to_edit(&text, &placement(), DEFAULT_MIN_EXTENT) else {
            panic!("expected a create edit");
        };
        assert_eq!(shape.text(), Some("hi"));

        let circle = AiCommand::new("createShape", json!({"type": "circle", "x": 5, "y": 5, "radius": 7}));
        let Ok(Edit::Create(shape)) = to_edit(&circle, &placement(), DEFAULT_MIN_EXTENT) else {
            panic!("expected a create edit");
        };
        assert_eq!(
            shape.geometry(),
            Geometry::Round {
                center: Point::new(5.0, 5.0),
                radius: 7.0
            }
        );
    }

    #[test]
    fn test_create_clamps_to_min_extent() {
        let rect = AiCommand::new(
            "createShape",
            json!({"type": "rectangle", "x": 0, "y": 0, "width": 1, "height": 40}),
        );
        let Ok(Edit::Create(shape)) = to_edit(&rect, &placement(), 10.0) else {
            panic!("expected a create edit");
        };
        assert_eq!(
            shape.geometry(),
            Geometry::Boxed {
                position: Point::new(0.0, 0.0),
                width: 10.0,
                height: 40.0
            }
        );

        let circle = AiCommand::new("createShape", json!({"type": "circle", "x": 0, "y": 0, "radius": 1}));
        let Ok(Edit::Create(shape)) = to_edit(&circle, &placement(), 10.0) else {
            panic!("expected a create edit");
        };
        assert_eq!(
            shape.geometry(),
            Geometry::Round {
                center: Point::new(0.0, 0.0),
                radius: 5.0
            }
        );
    }

    #[test]
    fn test_move_shape() {
        let id = ShapeId::new_v4();
        let command = AiCommand::new("moveShape", json!({"shapeId": id, "x": 1, "y": 2}));
        assert_eq!(
            to_edit(&command, &placement(), DEFAULT_MIN_EXTENT),
            Ok(Edit::Move {
                id,
                to: Point::new(1.0, 2.0)
            })
        );
    }

    #[test]
    fn test_unsupported_action() {
        let command = AiCommand::new("selectShape", json!({"shapeId": ShapeId::new_v4()}));
        assert_eq!(
            to_edit(&command, &placement(), DEFAULT_MIN_EXTENT),
            Err(CommandError::Unsupported("selectShape".into()))
        );
    }

    #[test]
    fn test_invalid_params() {
        let missing = AiCommand::new("moveShape", json!({"x": 1, "y": 2}));
        assert!(matches!(
            to_edit(&missing, &placement(), DEFAULT_MIN_EXTENT),
            Err(CommandError::InvalidParams { .. })
        ));

        let bad_kind = AiCommand::new("createShape", json!({"type": "hexagon", "x": 1, "y": 2}));
        assert!(matches!(
            to_edit(&bad_kind, &placement(), DEFAULT_MIN_EXTENT),
            Err(CommandError::InvalidParams { .. })
        ));

        let negative = AiCommand::new("resizeShape", json!({"shapeId": ShapeId::new_v4(), "width": -4}));
        assert!(matches!(
            to_edit(&negative, &placement(), DEFAULT_MIN_EXTENT),
            Err(CommandError::InvalidParams { .. })
        ));

        let empty = AiCommand::new("resizeShape", json!({"shapeId": ShapeId::new_v4()}));
        assert!(matches!(
            to_edit(&empty, &placement(), DEFAULT_MIN_EXTENT),
            Err(CommandError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_batch_keeps_valid_subset() {
        let commands = vec![
            AiCommand::new("createShape", json!({"type": "rectangle", "x": 0, "y": 0})),
            AiCommand::new("selectShape", json!({})),
            AiCommand::new("updateText", json!({"shapeId": ShapeId::new_v4(), "text": "x"})),
        ];
        let (edits, skipped) = to_edits(&commands, &placement(), DEFAULT_MIN_EXTENT);
        assert_eq!(edits.len(), 2);
        assert_eq!(skipped, vec![CommandError::Unsupported("selectShape".into())]);
    }
}
