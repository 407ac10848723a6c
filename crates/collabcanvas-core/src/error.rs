//! Error types shared across the engine.

use crate::identity::UserId;
use crate::shapes::ShapeId;
use thiserror::Error;

/// Errors from talking to the canvas server.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Fetch or transmit failed; the next poll retries.
    #[error("Network error: {0}")]
    TransientNetwork(String),
    /// The server answered with something that does not decode.
    #[error("Malformed server data: {0}")]
    MalformedServerData(String),
    /// The engine was torn down before or while the operation ran.
    #[error("Engine has been torn down")]
    TornDown,
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::MalformedServerData(err.to_string())
    }
}

/// Result type for server operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Reasons a single edit is refused by the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("Unknown shape: {0}")]
    UnknownShape(ShapeId),
    #[error("Shape {id} is selected by {owner}")]
    SelectionConflict { id: ShapeId, owner: UserId },
    #[error("Shape {0} is not selected by the local user")]
    NotSelected(ShapeId),
    #[error("Shape {0} already exists")]
    DuplicateId(ShapeId),
    #[error("Shape {0} is not a text shape")]
    NotText(ShapeId),
}

/// Result type for edit application.
pub type EditResult<T> = Result<T, EditError>;

/// Reasons an agent command is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Unsupported command: {0}")]
    Unsupported(String),
    #[error("Invalid params for {action}: {reason}")]
    InvalidParams { action: String, reason: String },
    #[error(transparent)]
    Rejected(#[from] EditError),
}

/// A collection that repeats a shape id.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Duplicate shape id in collection: {0}")]
pub struct DuplicateShapeId(pub ShapeId);
