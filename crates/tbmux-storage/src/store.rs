// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The public face of the storage crate: log writes, log reads, and the
//! commit notification fan-out.

use tbmux_core::TbmuxError;
use tracing::debug;

use crate::batch::UpdateBatch;
use crate::database::Database;
use crate::notify::{UpdateNotifier, UpdateSubscription};
use crate::queries;

/// Durable update log plus message/chat cache. Cheap to clone; all clones
/// share one writer thread and one subscriber registry.
#[derive(Clone)]
pub struct UpdateStore {
    db: Database,
    notifier: UpdateNotifier,
}

impl UpdateStore {
    /// Open the store at `path`, creating the schema when missing.
    pub async fn open(path: &str) -> Result<Self, TbmuxError> {
        Ok(Self {
            db: Database::open(path).await?,
            notifier: UpdateNotifier::new(),
        })
    }

    /// Start a new write batch.
    pub fn begin(&self) -> UpdateBatch {
        UpdateBatch::new()
    }

    /// Commit a batch atomically. Subscribers are notified after the
    /// transaction lands, and only when it produced observable writes, so a
    /// woken long-poller is guaranteed to see the new rows.
    pub async fn commit(&self, batch: UpdateBatch) -> Result<(), TbmuxError> {
        let ops = batch.len();
        let updated = queries::updates::commit_batch(&self.db, batch).await?;
        debug!(ops, updated, "committed update batch");
        if updated {
            self.notifier.notify();
        }
        Ok(())
    }

    /// See [`queries::updates::last_update_id`].
    pub async fn last_update_id(&self) -> Result<u64, TbmuxError> {
        queries::updates::last_update_id(&self.db).await
    }

    /// See [`queries::updates::get_updates`].
    pub async fn get_updates(&self, offset: i64, limit: u64) -> Result<Vec<String>, TbmuxError> {
        queries::updates::get_updates(&self.db, offset, limit).await
    }

    /// See [`queries::chats::get_chat_type`].
    pub async fn get_chat_type(&self, chat_id: i64) -> Result<Option<String>, TbmuxError> {
        queries::chats::get_chat_type(&self.db, chat_id).await
    }

    /// Register for the next "some update committed" notification.
    pub fn subscribe(&self) -> UpdateSubscription {
        self.notifier.subscribe()
    }

    /// Wake every current subscriber. Normally driven by [`commit`](Self::commit).
    pub fn notify_updates(&self) {
        self.notifier.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn open_store() -> (UpdateStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = UpdateStore::open(dir.path().join("store.db").to_str().unwrap())
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn commit_with_writes_notifies_subscribers() {
        let (store, _dir) = open_store().await;
        let sub = store.subscribe();

        let mut batch = store.begin();
        batch.insert_update(1, "message", &json!({"text": "hello"}));
        store.commit(batch).await.unwrap();

        tokio::time::timeout(Duration::from_millis(50), sub.fired())
            .await
            .expect("subscriber must wake promptly after commit");
        // The woken subscriber must see the committed row.
        assert_eq!(store.get_updates(1, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_commit_does_not_notify() {
        let (store, _dir) = open_store().await;
        let sub = store.subscribe();
        store.commit(store.begin()).await.unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(50), sub.fired()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn manual_notify_wakes_subscribers() {
        let (store, _dir) = open_store().await;
        let sub = store.subscribe();
        store.notify_updates();
        tokio::time::timeout(Duration::from_millis(50), sub.fired())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn subscribers_before_commit_all_wake() {
        let (store, _dir) = open_store().await;
        let subs: Vec<_> = (0..4).map(|_| store.subscribe()).collect();

        let mut batch = store.begin();
        batch.insert_update(5, "callback_query", &json!({"id": "cq"}));
        store.commit(batch).await.unwrap();

        for sub in subs {
            tokio::time::timeout(Duration::from_millis(50), sub.fired())
                .await
                .unwrap();
        }
    }
}
