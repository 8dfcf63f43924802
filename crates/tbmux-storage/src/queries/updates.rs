// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update-log operations: batch commit, log reads, and the bootstrap id.
//!
//! Served envelopes are composed in SQL with `json_object`, producing
//! `{"update_id": <id>, "<type>": <payload>}` without re-parsing payloads.
//! The bootstrap convention is `+1`: [`last_update_id`] answers newest-id+1
//! (1 when the log is empty), which is exactly the offset a client should
//! poll with next.

use rusqlite::{params, OptionalExtension};
use tbmux_core::TbmuxError;

use crate::batch::{BatchOp, UpdateBatch};
use crate::database::{map_tr_err, Database};

/// Execute a batch inside one transaction. Returns whether any statement
/// changed a row (the caller notifies subscribers iff so).
pub async fn commit_batch(db: &Database, batch: UpdateBatch) -> Result<bool, TbmuxError> {
    if batch.is_empty() {
        return Ok(false);
    }
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut updated = false;
            for op in &batch.ops {
                match op {
                    BatchOp::Update {
                        upstream_id: Some(upstream_id),
                        kind,
                        payload,
                    } => {
                        let n = tx.execute(
                            r#"INSERT INTO updates (upstream_id, type, "update")
                               VALUES (?1, ?2, json(?3))
                               ON CONFLICT (upstream_id)
                               DO UPDATE SET type = excluded.type, "update" = excluded."update""#,
                            params![upstream_id, kind, payload],
                        )?;
                        updated |= n > 0;
                    }
                    BatchOp::Update {
                        upstream_id: None,
                        kind,
                        payload,
                    } => {
                        let n = tx.execute(
                            r#"INSERT INTO updates (type, "update") VALUES (?1, json(?2))"#,
                            params![kind, payload],
                        )?;
                        updated |= n > 0;
                    }
                    BatchOp::Message {
                        chat_id,
                        message_id,
                        thread_id,
                        chat,
                        message,
                    } => {
                        let n = tx.execute(
                            r#"INSERT INTO chats (id, chat) VALUES (?1, json(?2))
                               ON CONFLICT (id) DO UPDATE SET chat = excluded.chat"#,
                            params![chat_id, chat],
                        )?;
                        updated |= n > 0;
                        let n = tx.execute(
                            r#"INSERT INTO messages (chat_id, message_id, message_thread_id, message)
                               VALUES (?1, ?2, ?3, json(?4))
                               ON CONFLICT (chat_id, message_id)
                               DO UPDATE SET message_thread_id = excluded.message_thread_id,
                                             message = excluded.message"#,
                            params![chat_id, message_id, thread_id, message],
                        )?;
                        updated |= n > 0;
                    }
                }
            }
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

/// The id a client should poll with to see only future updates:
/// newest log id + 1, or 1 when the log is empty.
pub async fn last_update_id(db: &Database) -> Result<u64, TbmuxError> {
    db.connection()
        .call(|conn| {
            let id: Option<u64> = conn
                .query_row(
                    "SELECT id + 1 FROM updates ORDER BY id DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id.unwrap_or(1))
        })
        .await
        .map_err(map_tr_err)
}

/// Read fully-formed update envelopes from the log.
///
/// `offset > 0` selects rows with `id >= offset`; `offset <= 0` selects the
/// most recent `-offset` rows. Both in ascending id order, both capped by
/// `limit` (callers clamp it to 100, which also bounds this Vec).
pub async fn get_updates(
    db: &Database,
    offset: i64,
    limit: u64,
) -> Result<Vec<String>, TbmuxError> {
    db.connection()
        .call(move |conn| {
            let mut out = Vec::new();
            if offset > 0 {
                let mut stmt = conn.prepare_cached(
                    r#"SELECT json_object('update_id', id, type, json("update"))
                       FROM updates WHERE id >= ?1 ORDER BY id ASC LIMIT ?2"#,
                )?;
                let rows = stmt.query_map(params![offset, limit as i64], |row| {
                    row.get::<_, String>(0)
                })?;
                for row in rows {
                    out.push(row?);
                }
            } else {
                let mut stmt = conn.prepare_cached(
                    r#"SELECT json_object('update_id', id, type, json("update"))
                       FROM (SELECT id, type, "update" FROM updates ORDER BY id DESC LIMIT ?1)
                       ORDER BY id ASC LIMIT ?2"#,
                )?;
                let rows = stmt.query_map(params![-offset, limit as i64], |row| {
                    row.get::<_, String>(0)
                })?;
                for row in rows {
                    out.push(row?);
                }
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)
}
