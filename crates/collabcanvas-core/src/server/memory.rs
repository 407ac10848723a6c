//! In-memory canvas server.

use super::{BoxFuture, CanvasServer};
use crate::collection::ShapeCollection;
use crate::error::{SyncError, SyncResult};
use crate::timers::unix_now;
use crate::wire::{
    self, AiRequest, AiResponse, FetchResponse, HeartbeatRequest, HeartbeatResponse, OnlineUser,
    PushRequest,
};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

const MALFORMED_BODY: &str = r#"{"shapes":[{"type":"hexagon"}],"users":5}"#;

/// How the server should misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Requests fail as if the network were down.
    Network,
    /// Responses arrive but do not decode.
    Malformed,
}

/// In-memory server for testing and offline use.
///
/// Every request and response goes through the same JSON encoding a real
/// transport uses, so decoding failures surface the same way.
#[derive(Debug, Default)]
pub struct MemoryServer {
    shapes: RefCell<ShapeCollection>,
    users: RefCell<Vec<OnlineUser>>,
    failure: Cell<Option<FailureMode>>,
    latency: Cell<u32>,
    chat_reply: RefCell<AiResponse>,
    chat_requests: RefCell<Vec<AiRequest>>,
    fetch_count: Cell<usize>,
    push_count: Cell<usize>,
}

impl MemoryServer {
    /// Create an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a server already holding `shapes`.
    pub fn with_shapes(shapes: ShapeCollection) -> Self {
        let server = Self::new();
        server.set_shapes(shapes);
        server
    }

    /// Replace the stored collection directly (another client's write).
    pub fn set_shapes(&self, shapes: ShapeCollection) {
        *self.shapes.borrow_mut() = shapes;
    }

    /// The stored collection.
    pub fn shapes(&self) -> ShapeCollection {
        self.shapes.borrow().clone()
    }

    /// Make subsequent requests fail, or behave again with `None`.
    pub fn set_failure(&self, failure: Option<FailureMode>) {
        self.failure.set(failure);
    }

    /// Number of times each request yields before completing.
    pub fn set_latency(&self, yields: u32) {
        self.latency.set(yields);
    }

    /// Reply the agent endpoint returns.
    pub fn set_chat_reply(&self, reply: AiResponse) {
        *self.chat_reply.borrow_mut() = reply;
    }

    /// Agent requests received so far.
    pub fn chat_requests(&self) -> Vec<AiRequest> {
        self.chat_requests.borrow().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.get()
    }

    pub fn push_count(&self) -> usize {
        self.push_count.get()
    }

    /// Simulated round trip: wait, then fail or produce a response body.
    async fn round_trip(&self, respond: impl FnOnce() -> SyncResult<String>) -> SyncResult<String> {
        Latency {
            remaining: self.latency.get(),
        }
        .await;
        match self.failure.get() {
            Some(FailureMode::Network) => {
                Err(SyncError::TransientNetwork("connection refused".to_string()))
            }
            Some(FailureMode::Malformed) => {
                respond()?;
                Ok(MALFORMED_BODY.to_string())
            }
            None => respond(),
        }
    }
}

impl CanvasServer for MemoryServer {
    fn fetch(&self) -> BoxFuture<'_, SyncResult<ShapeCollection>> {
        Box::pin(async move {
            self.fetch_count.set(self.fetch_count.get() + 1);
            let body = self
                .round_trip(|| {
                    wire::encode(&FetchResponse {
                        shapes: self.shapes(),
                    })
                })
                .await?;
            let response: FetchResponse = wire::decode(&body)?;
            Ok(response.shapes)
        })
    }

    fn push(&self, user: &str, shapes: &ShapeCollection) -> BoxFuture<'_, SyncResult<ShapeCollection>> {
        let request = PushRequest {
            user: user.to_string(),
            shapes: shapes.clone(),
        };
        Box::pin(async move {
            self.push_count.set(self.push_count.get() + 1);
            let body = wire::encode(&request)?;
            let response = self
                .round_trip(|| {
                    let received: PushRequest = wire::decode(&body)?;
                    self.set_shapes(received.shapes);
                    wire::encode(&FetchResponse {
                        shapes: self.shapes(),
                    })
                })
                .await?;
            let stored: FetchResponse = wire::decode(&response)?;
            Ok(stored.shapes)
        })
    }

    fn reset(&self) -> BoxFuture<'_, SyncResult<()>> {
        Box::pin(async move {
            self.round_trip(|| {
                self.set_shapes(ShapeCollection::new());
                Ok(String::new())
            })
            .await?;
            Ok(())
        })
    }

    fn heartbeat(&self, user: &str) -> BoxFuture<'_, SyncResult<Vec<OnlineUser>>> {
        let request = HeartbeatRequest {
            user: user.to_string(),
        };
        Box::pin(async move {
            let body = self
                .round_trip(|| {
                    let mut users = self.users.borrow_mut();
                    if !users.iter().any(|u| u.user == request.user) {
                        users.push(OnlineUser {
                            user: request.user.clone(),
                            first_seen: unix_now(),
                        });
                    }
                    wire::encode(&HeartbeatResponse {
                        users: users.clone(),
                    })
                })
                .await?;
            let response: HeartbeatResponse = wire::decode(&body)?;
            Ok(response.users)
        })
    }

    fn chat(&self, request: &AiRequest) -> BoxFuture<'_, SyncResult<AiResponse>> {
        let request = request.clone();
        Box::pin(async move {
            let body = self
                .round_trip(|| {
                    self.chat_requests.borrow_mut().push(request);
                    wire::encode(&*self.chat_reply.borrow())
                })
                .await?;
            wire::decode(&body)
        })
    }
}

/// Yields to the executor a fixed number of times.
struct Latency {
    remaining: u32,
}

impl Future for Latency {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.remaining == 0 {
            return Poll::Ready(());
        }
        self.remaining -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Rectangle, Shape};
    use kurbo::Point;

    fn one_shape() -> ShapeCollection {
        ShapeCollection::from_shapes([Shape::Rectangle(Rectangle::new(Point::ZERO, 10.0, 10.0))])
            .unwrap()
    }

    #[tokio::test]
    async fn test_push_then_fetch() {
        let server = MemoryServer::new();
        let shapes = one_shape();

        let stored = server.push("alice", &shapes).await.unwrap();
        assert_eq!(stored, shapes);
        assert_eq!(server.fetch().await.unwrap(), shapes);
        assert_eq!(server.push_count(), 1);
        assert_eq!(server.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_reset_discards() {
        let server = MemoryServer::with_shapes(one_shape());
        server.reset().await.unwrap();
        assert!(server.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure() {
        let server = MemoryServer::with_shapes(one_shape());
        server.set_failure(Some(FailureMode::Network));
        assert!(matches!(
            server.fetch().await,
            Err(SyncError::TransientNetwork(_))
        ));
        assert!(server.push("alice", &ShapeCollection::new()).await.is_err());
        // Nothing was stored by the failed push.
        assert_eq!(server.shapes().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_responses() {
        let server = MemoryServer::with_shapes(one_shape());
        server.set_failure(Some(FailureMode::Malformed));
        assert!(matches!(
            server.fetch().await,
            Err(SyncError::MalformedServerData(_))
        ));
        assert!(matches!(
            server.heartbeat("alice").await,
            Err(SyncError::MalformedServerData(_))
        ));
    }

    #[tokio::test]
    async fn test_heartbeat_keeps_first_seen() {
        let server = MemoryServer::new();
        let first = server.heartbeat("alice").await.unwrap();
        let second = server.heartbeat("bob").await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(second[0], first[0]);
    }

    #[tokio::test]
    async fn test_latency_still_completes() {
        let server = MemoryServer::with_shapes(one_shape());
        server.set_latency(3);
        assert_eq!(server.fetch().await.unwrap().len(), 1);
    }
}
