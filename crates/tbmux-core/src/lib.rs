// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the tbmux bot-API multiplexing proxy.
//!
//! This crate provides the shared error type and the wire-protocol tables
//! (update kinds, echo mapping, envelope shapes) used by every other crate
//! in the workspace.

pub mod error;
pub mod protocol;

pub use error::TbmuxError;
pub use protocol::{
    echo_update_kind, is_message_kind, ErrorEnvelope, HTTP_BODY_LIMIT, HTTP_USER_AGENT,
    MESSAGE_UPDATE_KINDS,
};
