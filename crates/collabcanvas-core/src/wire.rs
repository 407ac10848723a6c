//! JSON payloads exchanged with the canvas server and the agent endpoint.
//!
//! Everything the server sends is decoded here, at the boundary, into typed
//! payloads. A body that does not decode becomes
//! [`SyncError::MalformedServerData`].

use crate::collection::ShapeCollection;
use crate::error::{SyncError, SyncResult};
use crate::identity::UserId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Response to `GET /api/shapes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub shapes: ShapeCollection,
}

/// Body of `POST /api/shapes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    pub user: UserId,
    pub shapes: ShapeCollection,
}

/// Body of `POST /api/users/heartbeat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub user: UserId,
}

/// Response to a heartbeat: everyone currently online.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub users: Vec<OnlineUser>,
}

/// An online user, for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    pub user: UserId,
    /// Unix seconds when the server first saw this user.
    #[serde(rename = "firstSeen")]
    pub first_seen: u64,
}

/// Pan offset in the agent's viewport description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanOffset {
    pub x: f64,
    pub y: f64,
}

/// Viewport as described to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub zoom: f64,
    pub pan: PanOffset,
}

/// Snapshot of the canvas sent along with an agent request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasState {
    pub shapes: ShapeCollection,
    pub viewport: ViewportState,
}

/// Body of `POST /api/ai/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRequest {
    pub user: UserId,
    pub message: String,
    #[serde(rename = "canvasState")]
    pub canvas_state: CanvasState,
}

/// One structured command issued by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiCommand {
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl AiCommand {
    /// Create a command from an action name and its params.
    pub fn new(action: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }
}

/// The agent's reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub message: String,
    #[serde(default)]
    pub commands: Vec<AiCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Error body returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Decode a server body into a typed payload.
pub fn decode<T: DeserializeOwned>(body: &str) -> SyncResult<T> {
    serde_json::from_str(body).map_err(SyncError::from)
}

/// Encode a payload for the server.
pub fn encode<T: Serialize>(payload: &T) -> SyncResult<String> {
    serde_json::to_string(payload).map_err(|e| SyncError::TransientNetwork(e.to_string()))
}
