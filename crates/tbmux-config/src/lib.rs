// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the tbmux proxy.
//!
//! TOML files merged through a Figment hierarchy with `TBMUX_*` environment
//! overrides, post-deserialization validation, and derivation of the runtime
//! [`Endpoints`] (upstream URL prefixes and downstream path segments).

pub mod endpoints;
pub mod loader;
pub mod model;
pub mod validation;

pub use endpoints::Endpoints;
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{DownstreamConfig, TbmuxConfig, UpstreamConfig};
pub use validation::{validate_config, ConfigError};
