// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. All functions accept `&Database` and run on the
//! single writer thread.

pub mod chats;
pub mod updates;
