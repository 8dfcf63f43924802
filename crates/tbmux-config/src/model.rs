// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the tbmux proxy.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level tbmux configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. The auth tokens and the listen address have no
/// usable defaults and are checked by validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TbmuxConfig {
    /// Path to the SQLite database file holding the update log.
    #[serde(default = "default_db")]
    pub db: String,

    /// Upstream bot API settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Downstream serving settings.
    #[serde(default)]
    pub downstream: DownstreamConfig,
}

impl Default for TbmuxConfig {
    fn default() -> Self {
        Self {
            db: default_db(),
            upstream: UpstreamConfig::default(),
            downstream: DownstreamConfig::default(),
        }
    }
}

fn default_db() -> String {
    "tbmux.db".to_string()
}

/// Upstream bot API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base API URL, concatenated with the escaped auth token to form the
    /// upstream API prefix.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base file-download URL. When unset, derived from `api_url` by
    /// inserting `file/` before its last path segment.
    #[serde(default)]
    pub file_url: Option<String>,

    /// Bot auth token issued by the upstream.
    #[serde(default)]
    pub auth_token: String,

    /// Long-poll timeout in seconds sent on every `getUpdates` call.
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout: u64,

    /// Upper bound in seconds for the doubling retry backoff.
    #[serde(default = "default_max_retry_interval")]
    pub max_retry_interval: u64,

    /// Update types requested from the upstream (`allowed_updates`).
    /// Empty means the upstream default set.
    #[serde(default)]
    pub filter_update_types: Vec<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            file_url: None,
            auth_token: String::new(),
            polling_timeout: default_polling_timeout(),
            max_retry_interval: default_max_retry_interval(),
            filter_update_types: Vec::new(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org/bot".to_string()
}

fn default_polling_timeout() -> u64 {
    60
}

fn default_max_retry_interval() -> u64 {
    600
}

/// Downstream serving configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DownstreamConfig {
    /// host:port the proxy listens on.
    #[serde(default)]
    pub listen_addr: String,

    /// URL path whose segments form the downstream API prefix. The last
    /// segment is completed with `auth_token`, mirroring the upstream
    /// `/bot<TOKEN>` layout.
    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// Shared token downstream clients must carry in the prefix.
    #[serde(default)]
    pub auth_token: String,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            listen_addr: String::new(),
            api_path: default_api_path(),
            auth_token: String::new(),
        }
    }
}

fn default_api_path() -> String {
    "/bot".to_string()
}
