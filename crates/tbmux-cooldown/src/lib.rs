// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FIFO cooldown ticket queue.
//!
//! A [`CooldownQueue`] grants tickets strictly in push order, with at least
//! the ticket's own cooldown elapsed since the previous grant on the same
//! queue. The cooldown is chosen per ticket at push time, so one queue can
//! serve callers with different rate classes.
//!
//! Tickets cancel through RAII: dropping an ungranted [`CooldownTicket`]
//! removes it from the queue and interrupts the waker, so a shorter cooldown
//! at the new head is honored promptly. A cancelled ticket never advances
//! the queue's last-grant time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use tracing::debug;

/// Minimum spacing between grants on the account-wide queue. The extra
/// nanosecond keeps the grant rate strictly under 30 per second.
pub const GLOBAL_COOLDOWN: Duration = Duration::from_nanos(1_000_000_000 / 30 + 1);

/// Minimum spacing between sends into one private chat.
pub const PRIVATE_CHAT_COOLDOWN: Duration = Duration::from_secs(1);

/// Minimum spacing between sends into one group, supergroup, or channel.
pub const NON_PRIVATE_CHAT_COOLDOWN: Duration = Duration::from_secs(3);

/// A FIFO queue of cooldown tickets. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct CooldownQueue {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    /// Interrupts a sleeping waker after a cancellation. `Notify` stores a
    /// permit when nobody is waiting, so a cancel racing the waker's sleep
    /// set-up is never lost; a spurious wake just recomputes and re-sleeps.
    interrupt: Notify,
}

#[derive(Default)]
struct State {
    queue: HashMap<u64, QueuedTicket>,
    front: u64,
    back: u64,
    last_grant: Option<Instant>,
    waker_running: bool,
}

struct QueuedTicket {
    grant: oneshot::Sender<()>,
    cooldown: Duration,
}

/// A pending position in a [`CooldownQueue`].
///
/// Await [`granted`](Self::granted) to wait for the grant. Dropping the
/// ticket before it is granted cancels it.
pub struct CooldownTicket {
    shared: Arc<Shared>,
    token: u64,
    grant: oneshot::Receiver<()>,
    granted: bool,
}

impl CooldownQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a ticket with the given cooldown.
    ///
    /// Spawns the waker task if the queue was empty; the spawn decision and
    /// the queue state share one mutex, so no ticket can be orphaned.
    pub fn push(&self, cooldown: Duration) -> CooldownTicket {
        let (tx, rx) = oneshot::channel();
        let token = {
            let mut state = self.shared.state.lock().expect("cooldown state poisoned");
            let token = state.back;
            state.back += 1;
            state.queue.insert(
                token,
                QueuedTicket {
                    grant: tx,
                    cooldown,
                },
            );
            if !state.waker_running {
                state.waker_running = true;
                tokio::spawn(run_waker(Arc::clone(&self.shared)));
            }
            token
        };
        CooldownTicket {
            shared: Arc::clone(&self.shared),
            token,
            grant: rx,
            granted: false,
        }
    }
}

impl CooldownTicket {
    /// Resolves when the waker grants this ticket.
    pub async fn granted(mut self) {
        // An error here means the queue itself went away; treat it as a
        // grant rather than stalling the caller forever.
        let _ = (&mut self.grant).await;
        self.granted = true;
    }
}

impl Drop for CooldownTicket {
    fn drop(&mut self) {
        if self.granted {
            return;
        }
        if let Ok(mut state) = self.shared.state.lock() {
            state.queue.remove(&self.token);
        }
        self.shared.interrupt.notify_one();
    }
}

/// Grants tickets in push order until the queue drains, then exits.
async fn run_waker(shared: Arc<Shared>) {
    loop {
        let wait = {
            let mut state = shared.state.lock().expect("cooldown state poisoned");
            loop {
                if state.front == state.back {
                    state.waker_running = false;
                    return;
                }
                let front = state.front;
                let Some(item) = state.queue.remove(&front) else {
                    // Cancelled ticket; skip without consuming time.
                    state.front += 1;
                    continue;
                };
                let now = Instant::now();
                let wait = match state.last_grant {
                    None => Duration::ZERO,
                    Some(last) => (last + item.cooldown).saturating_duration_since(now),
                };
                if wait.is_zero() {
                    state.last_grant = Some(now);
                    state.front += 1;
                    let _ = item.grant.send(());
                    continue;
                }
                state.queue.insert(front, item);
                break wait;
            }
        };
        debug!(wait = ?wait, "cooldown");
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shared.interrupt.notified() => {}
        }
    }
}
