// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upstream long-poll consumer for the tbmux proxy.
//!
//! The upstream bot API permits exactly one long-poll consumer per token, so
//! a single [`Poller`] owns that session and commits everything it receives
//! into the shared update log.

pub mod poller;

pub use poller::Poller;
