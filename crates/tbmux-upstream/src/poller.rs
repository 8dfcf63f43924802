// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The upstream long-poll cycle.
//!
//! One loop, forever: POST `getUpdates` with the current offset, commit the
//! returned batch as one transaction, advance the offset past the newest
//! upstream id, repeat. Before the first poll, `deleteWebhook` guarantees
//! long polling is allowed.
//!
//! Failure classification: 2xx succeeds; 4xx is fatal and ends the process
//! (the auth token is wrong, retrying cannot help). Everything else is
//! transient and retried with a doubling backoff: transport errors, 5xx,
//! `ok:false` envelopes, malformed bodies, storage errors.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use tbmux_config::{Endpoints, UpstreamConfig};
use tbmux_core::{is_message_kind, TbmuxError, HTTP_USER_AGENT};
use tbmux_storage::UpdateStore;

const INITIAL_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the single upstream long-poll session.
pub struct Poller {
    api_prefix: String,
    polling_timeout: u64,
    max_retry_interval: Duration,
    allowed_updates: String,
    store: UpdateStore,
    http: reqwest::Client,
    retry_interval: Duration,
}

enum Failure {
    Fatal(TbmuxError),
    Transient(TbmuxError),
}

impl Poller {
    pub fn new(
        upstream: &UpstreamConfig,
        endpoints: &Endpoints,
        store: UpdateStore,
    ) -> Result<Self, TbmuxError> {
        // No overall request timeout: getUpdates is held open by the
        // upstream for polling_timeout seconds.
        let http = reqwest::Client::builder()
            .user_agent(HTTP_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TbmuxError::upstream("failed to build HTTP client", e))?;
        Ok(Self {
            api_prefix: endpoints.api_prefix.clone(),
            polling_timeout: upstream.polling_timeout,
            max_retry_interval: Duration::from_secs(upstream.max_retry_interval),
            allowed_updates: endpoints.allowed_updates.clone(),
            store,
            http,
            retry_interval: INITIAL_RETRY_INTERVAL,
        })
    }

    /// Run the poll loop. Only returns on a fatal upstream rejection, which
    /// the caller turns into a non-zero process exit.
    pub async fn run(mut self) -> Result<(), TbmuxError> {
        loop {
            match self.delete_webhook().await {
                Ok(()) => break,
                Err(Failure::Fatal(err)) => return Err(err),
                Err(Failure::Transient(err)) => {
                    warn!(error = %err, "webhook cleanup failed, will retry");
                    self.backoff().await;
                }
            }
        }

        let mut offset: u64 = 0;
        loop {
            match self.poll_cycle(&mut offset).await {
                Ok(()) => self.retry_interval = INITIAL_RETRY_INTERVAL,
                Err(Failure::Fatal(err)) => return Err(err),
                Err(Failure::Transient(err)) => {
                    warn!(error = %err, "poll cycle failed, will retry");
                    self.backoff().await;
                }
            }
        }
    }

    /// `deleteWebhook?drop_pending_updates=false`: a registered webhook
    /// blocks long polling, so clear it without discarding queued updates.
    async fn delete_webhook(&self) -> Result<(), Failure> {
        let url = format!("{}/deleteWebhook", self.api_prefix);
        debug!(%url, "clearing upstream webhook");
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("drop_pending_updates=false")
            .send()
            .await
            .map_err(|e| {
                Failure::Transient(TbmuxError::upstream("webhook cleanup request failed", e))
            })?;
        classify_status(response.status())
    }

    /// One getUpdates round-trip plus the transaction that stores its batch.
    async fn poll_cycle(&self, offset: &mut u64) -> Result<(), Failure> {
        let url = format!("{}/getUpdates", self.api_prefix);
        let mut body = String::new();
        if *offset != 0 {
            body.push_str(&format!("offset={offset}&"));
        }
        body.push_str(&format!(
            "timeout={}&allowed_updates={}",
            self.polling_timeout, self.allowed_updates
        ));
        debug!(%url, %body, "polling upstream");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Failure::Transient(TbmuxError::upstream("poll request failed", e)))?;
        classify_status(response.status())?;

        let text = response.text().await.map_err(|e| {
            Failure::Transient(TbmuxError::upstream("failed to read poll response", e))
        })?;
        let envelope: Value = serde_json::from_str(&text).map_err(|e| {
            Failure::Transient(TbmuxError::upstream("malformed poll response", e))
        })?;
        if envelope.get("ok") != Some(&Value::Bool(true)) {
            return Err(Failure::Transient(TbmuxError::Upstream {
                message: format!(
                    "upstream error {}: {}",
                    envelope.get("error_code").and_then(Value::as_i64).unwrap_or(0),
                    envelope
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                ),
                source: None,
            }));
        }
        let result = envelope
            .get("result")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Failure::Transient(TbmuxError::Internal(
                    "poll result is not an array".to_string(),
                ))
            })?;

        let mut batch = self.store.begin();
        for update in result {
            let Some(fields) = update.as_object() else {
                warn!("skipping non-object update in poll result");
                continue;
            };
            let upstream_id = fields
                .get("update_id")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            *offset = (*offset).max(upstream_id + 1);
            for (kind, payload) in fields {
                if kind == "update_id" {
                    continue;
                }
                debug!(upstream_id, kind, "storing update");
                batch.insert_update(upstream_id, kind, payload);
                if is_message_kind(kind) {
                    batch.insert_message(payload);
                }
            }
        }
        self.store
            .commit(batch)
            .await
            .map_err(Failure::Transient)?;
        Ok(())
    }

    async fn backoff(&mut self) {
        tokio::time::sleep(self.retry_interval).await;
        self.retry_interval = (self.retry_interval * 2).min(self.max_retry_interval);
    }
}

/// 2xx succeeds, 4xx is fatal, anything else is transient.
fn classify_status(status: StatusCode) -> Result<(), Failure> {
    if status.is_success() {
        Ok(())
    } else if status.is_client_error() {
        Err(Failure::Fatal(TbmuxError::UpstreamFatal {
            status: status.as_u16(),
        }))
    } else {
        Err(Failure::Transient(TbmuxError::Upstream {
            message: format!("upstream returned {status}"),
            source: None,
        }))
    }
}
