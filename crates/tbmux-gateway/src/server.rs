// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! A single fallback route dispatches on the escaped request path: the API
//! prefix serves `getUpdates` locally and forwards every other method; the
//! file prefix forwards downloads; everything else is a 404. Errors are
//! always the upstream-compatible `{"ok":false,...}` envelope.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use tbmux_config::Endpoints;
use tbmux_core::{ErrorEnvelope, TbmuxError};
use tbmux_storage::UpdateStore;

use crate::forward::Forwarder;
use crate::longpoll;
use crate::routing::{match_prefix, PrefixMatch};

/// Shared state for the dispatch handler.
#[derive(Clone)]
pub struct GatewayState {
    pub store: UpdateStore,
    pub forwarder: Arc<Forwarder>,
    pub endpoints: Arc<Endpoints>,
    /// The downstream shared token completing the last prefix segment.
    pub auth_token: Arc<String>,
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
}

/// Bind the listen address and serve until the process ends.
pub async fn serve(listen_addr: &str, state: GatewayState) -> Result<(), TbmuxError> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .map_err(|e| TbmuxError::Config(format!("failed to bind {listen_addr}: {e}")))?;
    info!("HTTP server is listening on {listen_addr}");
    axum::serve(listener, app)
        .await
        .map_err(|e| TbmuxError::Internal(format!("HTTP server error: {e}")))
}

/// Route a request by prefix. The API prefix wins when both would match.
async fn dispatch(State(state): State<GatewayState>, req: Request) -> Response {
    let path = req.uri().path().to_string();

    match match_prefix(&path, &state.endpoints.api_segments, &state.auth_token) {
        PrefixMatch::Hit(suffix) if suffix == "getUpdates" => {
            longpoll::get_updates(&state, req).await
        }
        PrefixMatch::Hit(suffix) => state.forwarder.forward(req, false, &suffix).await,
        PrefixMatch::Unauthorized => error_response(StatusCode::UNAUTHORIZED),
        PrefixMatch::Miss => {
            match match_prefix(&path, &state.endpoints.file_segments, &state.auth_token) {
                PrefixMatch::Hit(suffix) => state.forwarder.forward(req, true, &suffix).await,
                PrefixMatch::Unauthorized => error_response(StatusCode::UNAUTHORIZED),
                PrefixMatch::Miss => error_response(StatusCode::NOT_FOUND),
            }
        }
    }
}

/// A JSON response with the headers every locally-generated reply carries.
pub(crate) fn json_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        Body::from(body),
    )
        .into_response()
}

/// The upstream-compatible error envelope for a status code.
pub(crate) fn error_response(status: StatusCode) -> Response {
    let envelope = ErrorEnvelope::from_status(
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Error"),
    );
    let body = serde_json::to_string(&envelope)
        .unwrap_or_else(|_| r#"{"ok":false,"error_code":500,"description":""}"#.to_string());
    json_response(status, body)
}
