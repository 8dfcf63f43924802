// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local "some update committed" pub/sub.
//!
//! Subscriptions are single-shot and edge-triggered: a notification fired
//! between subscribe and wait still wakes the subscriber, which is safe
//! because the long-poll handler re-reads the log after every wake-up.
//! Dropping a subscription deregisters it; deregistering after the handle
//! has fired is a no-op.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;

/// Registry of long-poll subscribers. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct UpdateNotifier {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: DashMap<u64, oneshot::Sender<()>>,
    next_token: AtomicU64,
}

/// A single-shot notification handle. Await [`fired`](Self::fired); drop to
/// cancel.
pub struct UpdateSubscription {
    inner: Arc<Inner>,
    token: u64,
    handle: oneshot::Receiver<()>,
}

impl UpdateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> UpdateSubscription {
        let (tx, rx) = oneshot::channel();
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.insert(token, tx);
        UpdateSubscription {
            inner: Arc::clone(&self.inner),
            token,
            handle: rx,
        }
    }

    /// Wake every currently-registered subscriber exactly once and drop
    /// their registrations.
    pub fn notify(&self) {
        let tokens: Vec<u64> = self.inner.subscribers.iter().map(|e| *e.key()).collect();
        for token in tokens {
            if let Some((_, tx)) = self.inner.subscribers.remove(&token) {
                let _ = tx.send(());
            }
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl UpdateSubscription {
    /// Resolves once a notification fires (or the notifier goes away).
    pub async fn fired(mut self) {
        let _ = (&mut self.handle).await;
    }
}

impl Drop for UpdateSubscription {
    fn drop(&mut self) {
        self.inner.subscribers.remove(&self.token);
    }
}
