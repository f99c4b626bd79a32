//! HTTP server for GitLab webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::GitLabApi;
use crate::config::Config;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::webhooks::{verify_token, EventKind, EVENT_HEADER, TOKEN_HEADER};

/// Path GitLab posts webhooks to.
pub const HOOK_PATH: &str = "/ws-hook-receiver";

/// Shared application state.
pub struct AppState<A> {
    /// Configuration.
    pub config: Arc<Config>,
    /// Event dispatcher.
    pub dispatcher: Arc<Dispatcher<A>>,
}

impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl IntoResponse for DispatchOutcome {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}

/// Build the HTTP router for the status bot.
pub fn build_router<A: GitLabApi + 'static>(state: AppState<A>) -> Router {
    Router::new()
        .route(HOOK_PATH, post(hook_receiver::<A>))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check::<A>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint; labels cannot be written without an API token.
async fn readiness_check<A: GitLabApi + 'static>(
    State(state): State<AppState<A>>,
) -> Result<Json<Value>, StatusCode> {
    if state.config.api_token.is_none() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "status": "ready" })))
}

/// Whether the request declares a JSON body (`application/json` or `application/*+json`).
fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "Bad Request").into_response()
}

/// Handle incoming GitLab webhooks.
///
/// This handler:
/// 1. Requires a JSON content type
/// 2. Verifies the `X-Gitlab-Token` secret
/// 3. Requires the `X-Gitlab-Event` header
/// 4. Parses the body and dispatches it
pub async fn hook_receiver<A: GitLabApi + 'static>(
    State(state): State<AppState<A>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_json(&headers) {
        warn!("Webhook without JSON content type");
        return bad_request();
    }

    let authorized = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|token| verify_token(token, &state.config.hook_secret));
    if !authorized {
        warn!("Missing or invalid X-Gitlab-Token");
        return (StatusCode::UNAUTHORIZED, "Not Authorized").into_response();
    }

    let Some(event) = headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok()) else {
        warn!("Missing X-Gitlab-Event header");
        return bad_request();
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Webhook body is not valid JSON");
            return bad_request();
        }
    };

    info!(event = %event, "Received GitLab webhook");
    state
        .dispatcher
        .dispatch(&EventKind::from_header(event), &payload)
        .await
        .into_response()
}
