//! Collab Canvas Reference Server
//!
//! Stores whatever collection a client pushes and hands it to every poller.
//! There is no server-side conflict arbitration: clients reconcile.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /api/shapes           -> { "shapes": [...] }
//! POST /api/shapes           <- { "user": "..", "shapes": [...] }
//! POST /api/reset            -> discards all shapes
//! POST /api/users/heartbeat  <- { "user": ".." } -> { "users": [...] }
//! POST /api/ai/chat          -> 501, interpretation happens elsewhere
//! GET  /health
//! ```

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use collabcanvas_core::ShapeCollection;
use collabcanvas_core::timers::unix_now;
use collabcanvas_core::wire::{
    ErrorBody, FetchResponse, HeartbeatRequest, HeartbeatResponse, OnlineUser, PushRequest,
};
use dashmap::DashMap;
use std::{net::SocketAddr, sync::Arc, time::Duration, time::Instant};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

const DEFAULT_PORT: u16 = 3030;
const DEFAULT_PRESENCE_SECS: u64 = 30;

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
struct ServerConfig {
    addr: SocketAddr,
    /// How long a user counts as online after their last heartbeat.
    presence_window: Duration,
}

impl ServerConfig {
    fn from_env() -> Self {
        let addr = std::env::var("COLLABCANVAS_ADDR")
            .ok()
            .and_then(|value| match value.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!("Ignoring COLLABCANVAS_ADDR={}: {}", value, e);
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)));
        let presence_secs = std::env::var("COLLABCANVAS_PRESENCE_SECS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_PRESENCE_SECS);
        Self {
            addr,
            presence_window: Duration::from_secs(presence_secs),
        }
    }
}

/// A user seen through heartbeats.
struct Presence {
    first_seen: u64,
    last_seen: Instant,
}

/// Shared application state
struct AppState {
    shapes: RwLock<ShapeCollection>,
    presence: DashMap<String, Presence>,
    presence_window: Duration,
}

impl AppState {
    fn new(presence_window: Duration) -> Self {
        Self {
            shapes: RwLock::new(ShapeCollection::new()),
            presence: DashMap::new(),
            presence_window,
        }
    }

    /// Mark `user` online and return everyone still inside the window,
    /// earliest first.
    fn touch(&self, user: &str) -> Vec<OnlineUser> {
        let now = Instant::now();
        self.presence
            .entry(user.to_string())
            .and_modify(|presence| presence.last_seen = now)
            .or_insert_with(|| Presence {
                first_seen: unix_now(),
                last_seen: now,
            });
        self.presence
            .retain(|_, presence| now.duration_since(presence.last_seen) <= self.presence_window);

        let mut users: Vec<OnlineUser> = self
            .presence
            .iter()
            .map(|entry| OnlineUser {
                user: entry.key().clone(),
                first_seen: entry.value().first_seen,
            })
            .collect();
        users.sort_by(|a, b| a.first_seen.cmp(&b.first_seen).then_with(|| a.user.cmp(&b.user)));
        users
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collabcanvas_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let app = router(Arc::new(AppState::new(config.presence_window)));

    info!("Collab Canvas server listening on {}", config.addr);
    info!("Presence window: {}s", config.presence_window.as_secs());
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/shapes", get(get_shapes).post(put_shapes))
        .route("/api/reset", post(reset))
        .route("/api/users/heartbeat", post(heartbeat))
        .route("/api/ai/chat", post(chat))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn get_shapes(State(state): State<Arc<AppState>>) -> Json<FetchResponse> {
    let shapes = state.shapes.read().await.clone();
    Json(FetchResponse { shapes })
}

/// Store the pushed collection as given.
async fn put_shapes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PushRequest>,
) -> Json<FetchResponse> {
    info!("{} pushed {} shapes", request.user, request.shapes.len());
    let mut shapes = state.shapes.write().await;
    *shapes = request.shapes;
    Json(FetchResponse {
        shapes: shapes.clone(),
    })
}

async fn reset(State(state): State<Arc<AppState>>) -> StatusCode {
    *state.shapes.write().await = ShapeCollection::new();
    info!("Canvas reset");
    StatusCode::NO_CONTENT
}

async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HeartbeatRequest>,
) -> Json<HeartbeatResponse> {
    let users = state.touch(&request.user);
    debug!("Heartbeat from {}, {} online", request.user, users.len());
    Json(HeartbeatResponse { users })
}

async fn chat() -> impl IntoResponse {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(ErrorBody {
            message: "No agent is configured on this server".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use collabcanvas_core::{Rectangle, Shape};
    use collabcanvas_core::kurbo::Point;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(AppState::new(Duration::from_secs(30))))
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn sample() -> ShapeCollection {
        ShapeCollection::from_shapes([Shape::Rectangle(Rectangle::new(
            Point::new(10.0, 10.0),
            20.0,
            20.0,
        ))])
        .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn test_push_then_fetch() {
        let app = app();
        let shapes = sample();
        let push = PushRequest {
            user: "alice".into(),
            shapes: shapes.clone(),
        };
        let response = app
            .clone()
            .oneshot(post_json("/api/shapes", serde_json::to_string(&push).unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/api/shapes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let fetched: FetchResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(fetched.shapes, shapes);
    }

    #[tokio::test]
    async fn test_reset_clears_shapes() {
        let state = Arc::new(AppState::new(Duration::from_secs(30)));
        *state.shapes.write().await = sample();

        let response = router(state.clone())
            .oneshot(post_json("/api/reset", String::new()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.shapes.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_push_rejected() {
        let state = Arc::new(AppState::new(Duration::from_secs(30)));
        let body = r#"{"user":"alice","shapes":[{"type":"hexagon"}]}"#.to_string();
        let response = router(state.clone())
            .oneshot(post_json("/api/shapes", body))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert!(state.shapes.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_heartbeat_lists_users() {
        let state = Arc::new(AppState::new(Duration::from_secs(30)));
        state.touch("bob");

        let response = router(state)
            .oneshot(post_json("/api/users/heartbeat", r#"{"user":"alice"}"#.into()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: HeartbeatResponse = serde_json::from_str(&body_string(response).await).unwrap();
        let mut names: Vec<_> = body.users.iter().map(|u| u.user.as_str()).collect();
        names.sort();
        assert_eq!(names, ["alice", "bob"]);
    }

    #[test]
    fn test_presence_window_expires() {
        let state = AppState::new(Duration::ZERO);
        state.touch("bob");
        std::thread::sleep(Duration::from_millis(5));
        let users = state.touch("alice");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user, "alice");
    }

    #[tokio::test]
    async fn test_chat_not_implemented() {
        let response = app()
            .oneshot(post_json("/api/ai/chat", "{}".into()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        let body: ErrorBody = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(!body.message.is_empty());
    }
}
