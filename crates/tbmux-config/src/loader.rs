// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./tbmux.toml` > `~/.config/tbmux/tbmux.toml`
//! > `/etc/tbmux/tbmux.toml`, with environment variable overrides via the
//! `TBMUX_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::TbmuxConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tbmux/tbmux.toml` (system-wide)
/// 3. `~/.config/tbmux/tbmux.toml` (user XDG config)
/// 4. `./tbmux.toml` (local directory)
/// 5. `TBMUX_*` environment variables
pub fn load_config() -> Result<TbmuxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TbmuxConfig::default()))
        .merge(Toml::file("/etc/tbmux/tbmux.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tbmux/tbmux.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tbmux.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
///
/// Used when the operator passes `--config`; the XDG hierarchy is skipped.
pub fn load_config_from_path(path: &Path) -> Result<TbmuxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TbmuxConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<TbmuxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TbmuxConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `TBMUX_UPSTREAM_AUTH_TOKEN` must map to
/// `upstream.auth_token`, not `upstream.auth.token`.
fn env_provider() -> Env {
    Env::prefixed("TBMUX_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("upstream_", "upstream.", 1)
            .replacen("downstream_", "downstream.", 1);
        mapped.into()
    })
}
