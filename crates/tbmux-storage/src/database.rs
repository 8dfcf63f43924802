// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and
//! migrations-on-open.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Query modules accept `&Database` and call through
//! `database.connection().call()`. Do NOT create additional Connection
//! instances for writes.

use std::time::Duration;

use tbmux_core::TbmuxError;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Handle to the single SQLite connection. Cheap to clone; clones share the
/// same background writer thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if necessary) the database at `path`, configure
    /// pragmas, and run all pending migrations.
    pub async fn open(path: &str) -> Result<Self, TbmuxError> {
        let conn = Connection::open(path).await.map_err(map_tr_err)?;
        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            crate::migrations::run_migrations(conn)
                .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Returns the shared connection handle.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), TbmuxError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Maps a tokio-rusqlite error into the shared storage error kind.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> TbmuxError {
    TbmuxError::Storage {
        source: Box::new(e),
    }
}
