// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the tbmux update log.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. The log holds three
//! tables: the id-ordered `updates` log, the `(chat_id, message_id)`-keyed
//! message cache, and the chat cache. Committing a batch that produced
//! observable writes wakes every long-poll subscriber, strictly after the
//! transaction lands.

pub mod batch;
pub mod database;
pub mod migrations;
pub mod notify;
pub mod queries;
pub mod store;

pub use batch::UpdateBatch;
pub use database::Database;
pub use notify::{UpdateNotifier, UpdateSubscription};
pub use store::UpdateStore;
