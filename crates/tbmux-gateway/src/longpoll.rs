// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The local long-poll `getUpdates` handler.
//!
//! Subscribe-then-query: the handler registers for the commit notification
//! before reading the log, so an update landing between the read and the
//! wait still wakes it. `offset=0` is a bootstrap ping answering the next
//! safe offset without burning a long-poll slot, because the log is never
//! pruned and historical offsets stay serveable.

use std::time::Duration;

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use tracing::error;

use tbmux_core::HTTP_BODY_LIMIT;

use crate::params::{content_type_is, form_field};
use crate::server::{error_response, json_response, GatewayState};

#[derive(Debug, Default, PartialEq, Eq)]
struct PollParams {
    offset: i64,
    limit: u64,
    timeout: u64,
}

/// JSON request bodies overlay only the fields they carry.
#[derive(Debug, Deserialize)]
struct PollParamsProbe {
    offset: Option<i64>,
    limit: Option<u64>,
    timeout: Option<u64>,
}

/// Parse `offset`/`limit`/`timeout` from the query string, a form body, and
/// a JSON body, in that precedence order. Unparseable values read as zero,
/// like the upstream server.
fn parse_params(query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> PollParams {
    let mut params = PollParams::default();

    let apply = |source: &[u8], params: &mut PollParams| {
        if let Some(v) = form_field(source, "offset") {
            params.offset = v.parse().unwrap_or(0);
        }
        if let Some(v) = form_field(source, "limit") {
            params.limit = v.parse().unwrap_or(0);
        }
        if let Some(v) = form_field(source, "timeout") {
            params.timeout = v.parse().unwrap_or(0);
        }
    };
    if let Some(query) = query {
        apply(query.as_bytes(), &mut params);
    }
    if content_type_is(headers, "application/x-www-form-urlencoded") {
        apply(body, &mut params);
    }
    if content_type_is(headers, "application/json") {
        if let Ok(probe) = serde_json::from_slice::<PollParamsProbe>(body) {
            if let Some(offset) = probe.offset {
                params.offset = offset;
            }
            if let Some(limit) = probe.limit {
                params.limit = limit;
            }
            if let Some(timeout) = probe.timeout {
                params.timeout = timeout;
            }
        }
    }
    params
}

pub(crate) async fn get_updates(state: &GatewayState, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let body = to_bytes(body, HTTP_BODY_LIMIT).await.unwrap_or_default();
    let mut params = parse_params(parts.uri.query(), &parts.headers, &body);

    // The log keeps every update, so offset=0 cannot mean "everything
    // pending" the way it does upstream. Answer the next safe offset and
    // let the client poll again.
    if params.offset == 0 {
        return match state.store.last_update_id().await {
            Ok(id) => json_response(
                StatusCode::OK,
                format!("{{\"ok\":true,\"result\":[{{\"update_id\":{id}}}]}}"),
            ),
            Err(err) => {
                error!(error = %err, "bootstrap offset read failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };
    }

    if params.limit == 0 || params.limit > 100 {
        params.limit = 100;
    }
    let deadline =
        tokio::time::Instant::now() + Duration::from_secs(params.timeout.min(86_400));

    loop {
        let subscription = state.store.subscribe();
        match state.store.get_updates(params.offset, params.limit).await {
            Ok(rows) if !rows.is_empty() => {
                let body = format!("{{\"ok\":true,\"result\":[{}]}}", rows.join(","));
                return json_response(StatusCode::OK, body);
            }
            Ok(_) => {}
            Err(err) => {
                error!(error = %err, "long-poll log read failed");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                return json_response(StatusCode::OK, "{\"ok\":true,\"result\":[]}".to_string());
            }
            _ = subscription.fired() => {}
        }
    }
}
