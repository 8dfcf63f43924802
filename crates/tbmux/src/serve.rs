// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup wiring: configuration, store, forwarder, poller, HTTP server.
//!
//! The HTTP server task and the poller loop run side by side; whichever
//! ends first ends the process. Transient upstream failures never reach
//! this layer; only configuration problems, bind failures, and the
//! poller's fatal 4xx classification do.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use tbmux_config::{
    load_config, load_config_from_path, validate_config, Endpoints, TbmuxConfig,
};
use tbmux_core::TbmuxError;
use tbmux_gateway::{Forwarder, GatewayState};
use tbmux_storage::UpdateStore;
use tbmux_upstream::Poller;

pub async fn run(config_path: Option<&Path>) -> Result<(), TbmuxError> {
    init_tracing();

    let config = load(config_path)?;
    if let Err(errors) = validate_config(&config) {
        for err in &errors {
            error!("{err}");
        }
        return Err(TbmuxError::Config(format!(
            "{} invalid configuration value(s)",
            errors.len()
        )));
    }
    let endpoints = Arc::new(
        Endpoints::resolve(&config).map_err(|e| TbmuxError::Config(e.to_string()))?,
    );

    let store = UpdateStore::open(&config.db).await?;
    info!(db = config.db.as_str(), "update log ready");

    let forwarder = Arc::new(Forwarder::new(&endpoints, store.clone())?);
    let poller = Poller::new(&config.upstream, &endpoints, store.clone())?;

    let state = GatewayState {
        store,
        forwarder,
        endpoints,
        auth_token: Arc::new(config.downstream.auth_token.clone()),
    };
    let listen_addr = config.downstream.listen_addr.clone();
    let server = tokio::spawn(async move { tbmux_gateway::serve(&listen_addr, state).await });
    let polling = tokio::spawn(poller.run());

    tokio::select! {
        result = server => match result {
            Ok(inner) => inner,
            Err(err) => Err(TbmuxError::Internal(format!("HTTP server task failed: {err}"))),
        },
        result = polling => match result {
            Ok(inner) => inner,
            Err(err) => Err(TbmuxError::Internal(format!("poller task failed: {err}"))),
        },
    }
}

fn load(config_path: Option<&Path>) -> Result<TbmuxConfig, TbmuxError> {
    let loaded = match config_path {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };
    loaded.map_err(|e| TbmuxError::Config(e.to_string()))
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the default
/// info-level filter.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
