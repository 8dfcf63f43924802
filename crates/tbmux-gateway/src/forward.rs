// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request forwarding to the upstream API, with cooldown gating and echo
//! capture.
//!
//! For API calls the request body must be readable twice: once to peek the
//! `chat_id` (form or JSON) and once for the upstream request. The peek
//! buffers at most the JSON cap; the upstream body replays the buffer and
//! then continues streaming whatever the client is still sending. Media
//! types the upstream parses server-side (multipart uploads) stream through
//! untouched.
//!
//! Message-producing methods tee their 2xx response body: the downstream
//! client streams it unchanged while a mirror accumulates, and once the
//! upstream body ends the mirror is parsed into synthetic updates. That way
//! local pollers observe their own sends the same way they observe inbound
//! traffic. A downstream disconnect does not abort the capture.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{HeaderName, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

use tbmux_config::Endpoints;
use tbmux_cooldown::{
    CooldownQueue, GLOBAL_COOLDOWN, NON_PRIVATE_CHAT_COOLDOWN, PRIVATE_CHAT_COOLDOWN,
};
use tbmux_core::{echo_update_kind, TbmuxError, HTTP_BODY_LIMIT, HTTP_USER_AGENT};
use tbmux_storage::{UpdateBatch, UpdateStore};

use crate::params::{content_type_is, form_field};
use crate::server::error_response;

/// Proxies downstream requests to the upstream API.
pub struct Forwarder {
    api_prefix: String,
    file_prefix: String,
    store: UpdateStore,
    http: reqwest::Client,
    global_queue: CooldownQueue,
    /// Lazily-created per-chat queues; never evicted, chat ids repeat.
    chat_queues: Mutex<HashMap<i64, CooldownQueue>>,
}

impl Forwarder {
    pub fn new(endpoints: &Endpoints, store: UpdateStore) -> Result<Self, TbmuxError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TbmuxError::upstream("failed to build HTTP client", e))?;
        Ok(Self {
            api_prefix: endpoints.api_prefix.clone(),
            file_prefix: endpoints.file_prefix.clone(),
            store,
            http,
            global_queue: CooldownQueue::new(),
            chat_queues: Mutex::new(HashMap::new()),
        })
    }

    /// Forward one downstream request. Errors surface as envelope responses
    /// until the upstream status line is relayed; after that they can only
    /// be logged.
    pub async fn forward(&self, req: Request, is_file_request: bool, suffix: &str) -> Response {
        let (parts, body) = req.into_parts();

        let prefix = if is_file_request {
            &self.file_prefix
        } else {
            &self.api_prefix
        };
        let url = match parts.uri.query() {
            Some(query) if !query.is_empty() => format!("{prefix}/{suffix}?{query}"),
            _ => format!("{prefix}/{suffix}"),
        };
        debug!(method = %parts.method, %url, "forwarding request");

        let upstream_body = if is_file_request {
            reqwest::Body::wrap_stream(body.into_data_stream())
        } else {
            let (chat_id, replayed) = extract_chat_id(&parts.headers, parts.uri.query(), body).await;
            if chat_id != 0 {
                if let Err(response) = self.wait_for_cooldown(chat_id).await {
                    return response;
                }
            }
            replayed
        };

        let mut upstream_req = self.http.request(parts.method.clone(), &url);
        for (name, value) in parts.headers.iter() {
            if !strip_request_header(name) {
                upstream_req = upstream_req.header(name, value);
            }
        }
        let upstream_resp = match upstream_req
            .header(USER_AGENT, HTTP_USER_AGENT)
            .body(upstream_body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!(error = %err, %url, "upstream request failed");
                return error_response(StatusCode::BAD_GATEWAY);
            }
        };

        let status = upstream_resp.status();
        let mut headers = HeaderMap::new();
        for (name, value) in upstream_resp.headers() {
            if !strip_response_header(name) {
                headers.append(name, value.clone());
            }
        }

        let echo_kind = if is_file_request {
            None
        } else {
            echo_update_kind(suffix)
        };
        let body = match echo_kind {
            Some(kind) if status.is_success() => self.tee_echo_body(kind, upstream_resp),
            _ => Body::from_stream(upstream_resp.bytes_stream()),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }

    /// Chat queue first, then the global queue. The reverse order would
    /// spend a global tick while still blocked on the chat queue.
    async fn wait_for_cooldown(&self, chat_id: i64) -> Result<(), Response> {
        let chat_type = match self.store.get_chat_type(chat_id).await {
            Ok(chat_type) => chat_type,
            Err(err) => {
                error!(error = %err, chat_id, "chat lookup failed");
                return Err(error_response(StatusCode::INTERNAL_SERVER_ERROR));
            }
        };
        // Unknown chats get the conservative non-private spacing.
        let cooldown = match chat_type.as_deref() {
            Some("private") => PRIVATE_CHAT_COOLDOWN,
            _ => NON_PRIVATE_CHAT_COOLDOWN,
        };

        let queue = {
            let mut queues = self.chat_queues.lock().expect("chat queue map poisoned");
            queues.entry(chat_id).or_default().clone()
        };
        queue.push(cooldown).granted().await;
        self.global_queue.push(GLOBAL_COOLDOWN).granted().await;
        Ok(())
    }

    /// Stream the upstream body to the client while mirroring it; parse the
    /// mirror into echo updates once the upstream body ends.
    fn tee_echo_body(&self, kind: &'static str, upstream: reqwest::Response) -> Body {
        let (tx, rx) = mpsc::channel::<Result<Bytes, reqwest::Error>>(8);
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut stream = upstream.bytes_stream();
            let mut mirror = BytesMut::new();
            let mut client_gone = false;
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        mirror.extend_from_slice(&bytes);
                        if !client_gone && tx.send(Ok(bytes)).await.is_err() {
                            client_gone = true;
                            debug!("downstream client left during echo capture");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "upstream body error during echo capture");
                        if !client_gone {
                            let _ = tx.send(Err(err)).await;
                        }
                        // The mirror is incomplete; do not fabricate updates
                        // from a truncated body.
                        return;
                    }
                }
            }
            drop(tx);
            process_echo(&store, kind, &mirror).await;
        });
        Body::from_stream(ReceiverStream::new(rx))
    }
}

/// Extract `chat_id` from the query string and, for form or JSON bodies,
/// from the body itself. Returns the id (0 = absent) and the upstream body
/// that replays whatever was peeked.
async fn extract_chat_id(
    headers: &HeaderMap,
    query: Option<&str>,
    body: Body,
) -> (i64, reqwest::Body) {
    let mut chat_id = 0i64;
    if let Some(query) = query {
        if let Some(v) = form_field(query.as_bytes(), "chat_id") {
            chat_id = v.parse().unwrap_or(0);
        }
    }

    let is_form = content_type_is(headers, "application/x-www-form-urlencoded");
    let is_json = content_type_is(headers, "application/json");
    if !is_form && !is_json {
        return (chat_id, reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let (peeked, replayed) = peek_body(body, HTTP_BODY_LIMIT).await;
    if is_form {
        if let Some(v) = form_field(&peeked, "chat_id") {
            chat_id = v.parse().unwrap_or(0);
        }
    } else if let Ok(probe) = serde_json::from_slice::<ChatIdProbe>(&peeked) {
        if probe.chat_id != 0 {
            chat_id = probe.chat_id;
        }
    }
    (chat_id, replayed)
}

#[derive(Debug, Deserialize)]
struct ChatIdProbe {
    #[serde(default)]
    chat_id: i64,
}

/// Read up to `cap` bytes into a buffer, returning the buffer and a body
/// that yields the buffer first and then resumes the original stream.
async fn peek_body(body: Body, cap: usize) -> (Bytes, reqwest::Body) {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();
    let mut exhausted = false;
    while buf.len() < cap {
        match stream.next().await {
            Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
            // On a downstream read error there is nothing more to relay;
            // replay what arrived and let the upstream see a short body.
            Some(Err(err)) => {
                warn!(error = %err, "request body error during chat-id peek");
                exhausted = true;
                break;
            }
            None => {
                exhausted = true;
                break;
            }
        }
    }
    let peeked = buf.freeze();
    let replayed = if exhausted {
        // Fully buffered: hand reqwest plain bytes with a known length.
        reqwest::Body::from(peeked.clone())
    } else {
        let head = futures::stream::once({
            let replay = peeked.clone();
            async move { Ok::<Bytes, axum::Error>(replay) }
        });
        reqwest::Body::wrap_stream(head.chain(stream))
    };
    (peeked, replayed)
}

/// Parse a mirrored 2xx response body and commit the synthetic updates it
/// implies. Failures here never reach the downstream client.
async fn process_echo(store: &UpdateStore, kind: &'static str, body: &[u8]) {
    let envelope: Value = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "echo response is not JSON");
            return;
        }
    };
    if envelope.get("ok") != Some(&Value::Bool(true)) {
        warn!(
            error_code = envelope.get("error_code").and_then(serde_json::Value::as_i64).unwrap_or(0),
            description = envelope
                .get("description")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(""),
            "upstream reported failure in echo response"
        );
        return;
    }
    let Some(result) = envelope.get("result") else {
        return;
    };

    let mut batch = UpdateBatch::new();
    match result {
        Value::Array(messages) => {
            for message in messages {
                push_echo(&mut batch, kind, message);
            }
        }
        Value::Object(_) => push_echo(&mut batch, kind, result),
        // Edits of inline-keyboard-only messages acknowledge with `true`;
        // there is no message to echo.
        Value::Bool(_) => {}
        other => warn!(?other, "unexpected echo result shape"),
    }
    if batch.is_empty() {
        return;
    }
    debug!(kind, updates = batch.len(), "storing echo updates");
    if let Err(err) = store.commit(batch).await {
        error!(error = %err, "failed to store echo updates");
    }
}

fn push_echo(batch: &mut UpdateBatch, kind: &str, message: &Value) {
    batch.insert_local_update(kind, message);
    batch.insert_message(message);
}

/// Hop-by-hop and encoding headers never travel upstream; neither do Host
/// and the client's User-Agent.
fn strip_request_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "accept-encoding" | "content-encoding" | "connection" | "host" | "proxy-connection"
            | "user-agent"
    )
}

/// Hop-by-hop and encoding headers never travel back downstream.
fn strip_response_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "accept-encoding" | "content-encoding" | "connection" | "proxy-connection"
    )
}
