use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::header::{HeaderName, AUTHORIZATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::controller::{BeatPosition, MetronomeController, TempoNudge};
use crate::engine::EngineSnapshot;
use crate::error::{log_metronome_error, ErrorCode, MetronomeError};

use super::sse;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct DebugHttpState {
    pub controller: Arc<MetronomeController>,
    token: Arc<String>,
}

impl DebugHttpState {
    pub fn new(controller: Arc<MetronomeController>, token: String) -> Self {
        Self {
            controller,
            token: Arc::new(token),
        }
    }

    fn authorize(
        &self,
        headers: &HeaderMap,
        query_token: Option<&str>,
    ) -> Result<(), HttpServerError> {
        let provided = extract_token(headers, query_token);
        match provided {
            Some(value) if value == *self.token => Ok(()),
            _ => Err(HttpServerError::Unauthorized),
        }
    }
}

/// Query payload for extracting token from URL.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub token: Option<String>,
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    Unauthorized,
    BadRequest(String),
    Gone(&'static str),
    Internal(String),
}

impl From<MetronomeError> for HttpServerError {
    fn from(err: MetronomeError) -> Self {
        log_metronome_error(&err, "debug HTTP request");
        match err {
            MetronomeError::InvalidTempo { .. } => Self::BadRequest(err.message()),
            MetronomeError::Disposed => Self::Gone("metronome engine disposed"),
            MetronomeError::RuntimeUnavailable => Self::Internal(err.message()),
        }
    }
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "missing or invalid token".into()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Gone(msg) => (StatusCode::GONE, msg.to_string()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub engine_running: bool,
    pub disposed: bool,
}

/// State endpoint response payload.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    #[serde(flatten)]
    pub snapshot: EngineSnapshot,
    pub beat: Option<BeatPosition>,
}

/// Body of `POST /tempo`.
#[derive(Debug, Deserialize)]
pub struct TempoRequest {
    pub bpm: f64,
}

/// Body of `POST /nudge`.
#[derive(Debug, Deserialize)]
pub struct NudgeRequest {
    pub nudge: TempoNudge,
}

/// Tempo acknowledgement payload.
#[derive(Debug, Serialize)]
pub struct TempoAck {
    pub bpm: f64,
}

/// Run state acknowledgement payload.
#[derive(Debug, Serialize)]
pub struct RunAck {
    pub running: bool,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: DebugHttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(engine_state))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/toggle", post(toggle))
        .route("/tempo", post(set_tempo))
        .route("/nudge", post(nudge))
        .route("/telemetry", get(telemetry_stream_handler))
        .with_state(state)
}

/// Run the HTTP server loop.
pub async fn run_http_server(state: DebugHttpState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding debug HTTP listener")?;
    let router = build_router(state);
    axum::serve(listener, router)
        .await
        .context("serving debug HTTP router")?;
    Ok(())
}

pub async fn health(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<HealthResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    let snapshot = state.controller.snapshot();
    Ok(Json(HealthResponse {
        status: if snapshot.disposed { "disposed" } else { "ok" },
        engine_running: snapshot.running,
        disposed: snapshot.disposed,
    }))
}

pub async fn engine_state(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<StateResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    Ok(Json(state_response(&state.controller)))
}

pub async fn start(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<StateResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    state.controller.start().await?;
    Ok(Json(state_response(&state.controller)))
}

pub async fn stop(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<StateResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    state.controller.stop().await?;
    Ok(Json(state_response(&state.controller)))
}

pub async fn toggle(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<RunAck>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    let running = state.controller.toggle().await?;
    Ok(Json(RunAck { running }))
}

pub async fn set_tempo(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    Json(request): Json<TempoRequest>,
) -> Result<Json<TempoAck>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    let bpm = state.controller.set_bpm(request.bpm).await?;
    Ok(Json(TempoAck { bpm }))
}

pub async fn nudge(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    Json(request): Json<NudgeRequest>,
) -> Result<Json<TempoAck>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    let bpm = state.controller.nudge(request.nudge).await?;
    Ok(Json(TempoAck { bpm }))
}

pub async fn telemetry_stream_handler(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<sse::TelemetryStream, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    Ok(sse::telemetry(state.controller.engine()))
}

fn state_response(controller: &MetronomeController) -> StateResponse {
    StateResponse {
        snapshot: controller.snapshot(),
        beat: controller.beat_position(),
    }
}

fn extract_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    if let Some(token) = query_token {
        return Some(token.to_string());
    }

    static X_DEBUG_TOKEN: HeaderName = HeaderName::from_static("x-debug-token");

    headers
        .get(&X_DEBUG_TOKEN)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| raw.strip_prefix("Bearer ").map(|v| v.to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::TempoLimits;
    use crate::engine::{MetronomeEngine, StubBackend};
    use axum::body::{to_bytes, Body};
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    const TOKEN: &str = "smoke-token";

    fn make_router() -> Router {
        let engine = MetronomeEngine::builder(120.0, Arc::new(StubBackend::new()))
            .spawn()
            .expect("engine spawn");
        let controller = MetronomeController::new(engine, TempoLimits::default(), 4);
        build_router(DebugHttpState::new(Arc::new(controller), TOKEN.to_string()))
    }

    async fn response_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let json = serde_json::from_slice::<Value>(&bytes).expect("JSON body");
        (status, json)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("GET request")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("x-debug-token", TOKEN)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("POST request")
    }

    #[tokio::test]
    async fn health_requires_token() {
        let response = make_router()
            .oneshot(get_request("/health"))
            .await
            .expect("health call");
        let (status, json) = response_json(response).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "missing or invalid token");
    }

    #[tokio::test]
    async fn health_succeeds_with_token() {
        let response = make_router()
            .oneshot(get_request(&format!("/health?token={TOKEN}")))
            .await
            .expect("health call");
        let (status, json) = response_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["engine_running"], false);
    }

    #[tokio::test]
    async fn bearer_token_accepted() {
        let request = Request::builder()
            .uri("/state")
            .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .expect("state request");
        let (status, json) =
            response_json(make_router().oneshot(request).await.expect("state call")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["bpm"], 120.0);
        assert_eq!(json["tick_count"], 0);
        assert!(json["beat"].is_null());
    }

    #[tokio::test]
    async fn start_reports_first_beat() {
        let router = make_router();
        let (status, json) = response_json(
            router
                .oneshot(post_json("/start", Value::Null))
                .await
                .expect("start call"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["running"], true);
        assert_eq!(json["tick_count"], 1);
        assert_eq!(json["beat"]["beat"], 1);
        assert_eq!(json["beat"]["accented"], true);
    }

    #[tokio::test]
    async fn tempo_is_clamped() {
        let (status, json) = response_json(
            make_router()
                .oneshot(post_json("/tempo", serde_json::json!({ "bpm": 500.0 })))
                .await
                .expect("tempo call"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["bpm"], 200.0);
    }

    #[tokio::test]
    async fn nudge_applies_coarse_step() {
        let (status, json) = response_json(
            make_router()
                .oneshot(post_json(
                    "/nudge",
                    serde_json::json!({ "nudge": "down_coarse" }),
                ))
                .await
                .expect("nudge call"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["bpm"], 115.0);
    }

    #[tokio::test]
    async fn disposed_engine_is_gone() {
        let engine = MetronomeEngine::builder(120.0, Arc::new(StubBackend::new()))
            .spawn()
            .expect("engine spawn");
        let controller = Arc::new(MetronomeController::new(engine, TempoLimits::default(), 4));
        controller.shutdown().await.expect("shutdown");
        let router = build_router(DebugHttpState::new(controller, TOKEN.to_string()));

        let (status, json) = response_json(
            router
                .oneshot(post_json("/start", Value::Null))
                .await
                .expect("start call"),
        )
        .await;

        assert_eq!(status, StatusCode::GONE);
        assert_eq!(json["error"], "metronome engine disposed");
    }

    #[tokio::test]
    async fn toggle_flips_run_state() {
        let router = make_router();
        let (_, first) = response_json(
            router
                .clone()
                .oneshot(post_json("/toggle", Value::Null))
                .await
                .expect("toggle call"),
        )
        .await;
        let (_, second) = response_json(
            router
                .oneshot(post_json("/toggle", Value::Null))
                .await
                .expect("toggle call"),
        )
        .await;

        assert_eq!(first["running"], true);
        assert_eq!(second["running"], false);
    }
}
