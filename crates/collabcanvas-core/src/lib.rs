//! Collab Canvas Core Library
//!
//! Platform-agnostic client logic for the shared canvas: shapes, selection
//! locking, reconciliation against the server, the mutation pipeline and the
//! interaction state machine, tied together by [`CanvasEngine`].

pub mod collection;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod handles;
pub mod identity;
pub mod interaction;
pub mod pipeline;
pub mod reconcile;
pub mod selection;
pub mod server;
pub mod shapes;
pub mod timers;
pub mod viewport;
pub mod wire;

pub use kurbo;

pub use collection::ShapeCollection;
pub use config::{EngineConfig, PlacementDefaults};
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, DiagnosticsConfig, MemorySink};
pub use engine::{AgentReply, BatchReport, CanvasEngine, TickReport};
pub use error::{CommandError, EditError, SyncError, SyncResult};
pub use handles::HandleKind;
pub use identity::UserId;
pub use interaction::{Effect, InteractionSession, InteractionState, ToolKind};
pub use pipeline::{BatchOutcome, Edit, EditOrigin, EditPolicy};
pub use reconcile::{MergeContext, Merged, merge};
pub use selection::{ClickOutcome, LockState};
pub use server::{BoxFuture, CanvasServer, FailureMode, MemoryServer};
pub use shapes::{Circle, Geometry, Rectangle, Shape, ShapeId, ShapeKind, ShapeTrait, Text};
pub use viewport::Viewport;
