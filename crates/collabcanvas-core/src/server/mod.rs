//! Server contract for the canvas client.
//!
//! The engine never talks HTTP itself; hosts plug in a transport that
//! implements [`CanvasServer`] and decodes bodies with [`crate::wire`].

mod memory;

pub use memory::{FailureMode, MemoryServer};

use crate::collection::ShapeCollection;
use crate::error::SyncResult;
use crate::wire::{AiRequest, AiResponse, OnlineUser};
use std::future::Future;
use std::pin::Pin;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// The canvas server as the client sees it.
///
/// The engine is single-threaded, so implementations need not be `Send`.
pub trait CanvasServer {
    /// Fetch the full collection.
    fn fetch(&self) -> BoxFuture<'_, SyncResult<ShapeCollection>>;

    /// Store `shapes` as the canvas for everyone. Returns what was stored.
    fn push(&self, user: &str, shapes: &ShapeCollection) -> BoxFuture<'_, SyncResult<ShapeCollection>>;

    /// Discard all server data.
    fn reset(&self) -> BoxFuture<'_, SyncResult<()>>;

    /// Report `user` as online. Returns everyone online.
    fn heartbeat(&self, user: &str) -> BoxFuture<'_, SyncResult<Vec<OnlineUser>>>;

    /// Ask the agent. Interpretation happens server-side.
    fn chat(&self, request: &AiRequest) -> BoxFuture<'_, SyncResult<AiResponse>>;
}
