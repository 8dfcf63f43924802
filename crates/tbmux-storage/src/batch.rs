// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write batches: the transaction handle of the update store.
//!
//! An [`UpdateBatch`] accumulates inserts and is executed atomically by
//! [`UpdateStore::commit`](crate::store::UpdateStore::commit) as one SQL
//! transaction on the writer thread. Message inserts upsert the chat row in
//! the same transaction, so every cached message always has its chat cached
//! too.

use serde_json::Value;

/// Accumulated write operations, applied in insertion order on commit.
#[derive(Debug, Default)]
pub struct UpdateBatch {
    pub(crate) ops: Vec<BatchOp>,
}

#[derive(Debug)]
pub(crate) enum BatchOp {
    Update {
        upstream_id: Option<i64>,
        kind: String,
        payload: String,
    },
    Message {
        chat_id: i64,
        message_id: i64,
        thread_id: Option<i64>,
        chat: String,
        message: String,
    },
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an update received from upstream polling. A later insert with
    /// the same upstream id replaces the payload but keeps the local log id.
    pub fn insert_update(&mut self, upstream_id: u64, kind: impl Into<String>, payload: &Value) {
        self.ops.push(BatchOp::Update {
            upstream_id: Some(upstream_id as i64),
            kind: kind.into(),
            payload: payload.to_string(),
        });
    }

    /// Queue a locally-originated (echo) update; it carries no upstream id.
    pub fn insert_local_update(&mut self, kind: impl Into<String>, payload: &Value) {
        self.ops.push(BatchOp::Update {
            upstream_id: None,
            kind: kind.into(),
            payload: payload.to_string(),
        });
    }

    /// Queue a message-cache upsert (chat row included) for a message
    /// object. Missing numeric fields default to zero, matching the
    /// tolerant upstream parsers.
    pub fn insert_message(&mut self, message: &Value) {
        let message_id = message
            .get("message_id")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let thread_id = message.get("message_thread_id").and_then(Value::as_i64);
        let chat = message.get("chat").cloned().unwrap_or(Value::Null);
        let chat_id = chat.get("id").and_then(Value::as_i64).unwrap_or(0);
        self.ops.push(BatchOp::Message {
            chat_id,
            message_id,
            thread_id,
            chat: chat.to_string(),
            message: message.to_string(),
        });
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_fields_are_extracted() {
        let mut batch = UpdateBatch::new();
        batch.insert_message(&json!({
            "message_id": 100,
            "message_thread_id": 7,
            "chat": {"id": 42, "type": "supergroup"},
            "text": "hi"
        }));

        match &batch.ops[0] {
            BatchOp::Message {
                chat_id,
                message_id,
                thread_id,
                ..
            } => {
                assert_eq!(*chat_id, 42);
                assert_eq!(*message_id, 100);
                assert_eq!(*thread_id, Some(7));
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let mut batch = UpdateBatch::new();
        batch.insert_message(&json!({"text": "orphan"}));
        match &batch.ops[0] {
            BatchOp::Message {
                chat_id,
                message_id,
                thread_id,
                chat,
                ..
            } => {
                assert_eq!(*chat_id, 0);
                assert_eq!(*message_id, 0);
                assert_eq!(*thread_id, None);
                assert_eq!(chat, "null");
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn update_payload_is_serialized_json() {
        let mut batch = UpdateBatch::new();
        batch.insert_update(42, "message", &json!({"message_id": 1}));
        batch.insert_local_update("edited_message", &json!({"message_id": 2}));
        assert_eq!(batch.len(), 2);
        match &batch.ops[1] {
            BatchOp::Update { upstream_id, .. } => assert!(upstream_id.is_none()),
            other => panic!("unexpected op {other:?}"),
        }
    }
}
