// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Downstream HTTP front-end for the tbmux proxy.
//!
//! Serves an API-compatible surface on one listen address: the local
//! long-poll `getUpdates` handler backed by the update log, and transparent
//! forwarding of every other API method and file download to the upstream,
//! gated by the cooldown queues.

pub mod forward;
pub mod longpoll;
mod params;
pub mod routing;
pub mod server;

pub use forward::Forwarder;
pub use server::{router, serve, GatewayState};
