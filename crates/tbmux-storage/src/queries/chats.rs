// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-cache reads.

use rusqlite::{params, OptionalExtension};
use tbmux_core::TbmuxError;

use crate::database::{map_tr_err, Database};

/// The cached chat type (`private`, `group`, `supergroup`, `channel`) for a
/// chat id, or `None` when the chat has never been seen.
pub async fn get_chat_type(db: &Database, chat_id: i64) -> Result<Option<String>, TbmuxError> {
    db.connection()
        .call(move |conn| {
            let chat_type: Option<Option<String>> = conn
                .query_row(
                    "SELECT json_extract(chat, '$.type') FROM chats WHERE id = ?1",
                    params![chat_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(chat_type.flatten())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::UpdateBatch;
    use crate::queries::updates::commit_batch;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn chat_type_roundtrips_through_message_insert() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("chats.db").to_str().unwrap())
            .await
            .unwrap();

        let mut batch = UpdateBatch::new();
        batch.insert_message(&json!({
            "message_id": 1,
            "chat": {"id": 7, "type": "private"}
        }));
        batch.insert_message(&json!({
            "message_id": 2,
            "chat": {"id": 9, "type": "group"}
        }));
        commit_batch(&db, batch).await.unwrap();

        assert_eq!(
            get_chat_type(&db, 7).await.unwrap().as_deref(),
            Some("private")
        );
        assert_eq!(
            get_chat_type(&db, 9).await.unwrap().as_deref(),
            Some("group")
        );
        assert_eq!(get_chat_type(&db, 12345).await.unwrap(), None);
    }

    #[tokio::test]
    async fn later_message_updates_chat_record() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("chats2.db").to_str().unwrap())
            .await
            .unwrap();

        for chat_type in ["group", "supergroup"] {
            let mut batch = UpdateBatch::new();
            batch.insert_message(&json!({
                "message_id": 1,
                "chat": {"id": 5, "type": chat_type}
            }));
            commit_batch(&db, batch).await.unwrap();
        }

        assert_eq!(
            get_chat_type(&db, 5).await.unwrap().as_deref(),
            Some("supergroup")
        );
    }
}
