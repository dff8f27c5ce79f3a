//! Cancellable one-second tick subscriptions.
//!
//! A [`TickSource`] starts a repeating tick stream tagged with a
//! [`SubscriptionId`] and hands back a guard that stops it. The engine wraps
//! the guard in a [`Subscription`], which cancels on drop, so every exit
//! path (pause, reset, duration change, teardown) releases the stream.
//!
//! Cancellation is synchronous from the engine's point of view: once a
//! subscription is gone its id is no longer live, and any tick already queued
//! for it is discarded by the engine.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Stops a running tick stream.
pub trait TickGuard: Send {
    fn cancel(&mut self);
}

/// Something that can deliver ticks once per period.
pub trait TickSource: Send {
    /// Start a tick stream whose ticks carry `id`.
    fn subscribe(&mut self, id: SubscriptionId) -> Box<dyn TickGuard>;
}

/// A live tick stream. Dropping it cancels the stream.
pub struct Subscription {
    id: SubscriptionId,
    guard: Box<dyn TickGuard>,
}

impl Subscription {
    pub fn new(id: SubscriptionId, guard: Box<dyn TickGuard>) -> Self {
        Self { id, guard }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(id = self.id.0, "cancelling tick subscription");
        self.guard.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// ── Manual source ────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ManualState {
    live: Vec<SubscriptionId>,
    subscribed: u64,
    cancelled: u64,
}

/// Deterministic tick source driven by the caller.
///
/// Clones share state, so a test can keep one clone to inspect live
/// subscriptions while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTicks {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTicks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ids of every subscription that has not been cancelled.
    pub fn live(&self) -> Vec<SubscriptionId> {
        self.lock().live.clone()
    }

    /// The most recent live subscription, if any.
    pub fn current(&self) -> Option<SubscriptionId> {
        self.lock().live.last().copied()
    }

    pub fn subscribe_count(&self) -> u64 {
        self.lock().subscribed
    }

    pub fn cancel_count(&self) -> u64 {
        self.lock().cancelled
    }
}

struct ManualGuard {
    id: SubscriptionId,
    state: Arc<Mutex<ManualState>>,
    done: bool,
}

impl TickGuard for ManualGuard {
    fn cancel(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.live.retain(|id| *id != self.id);
        state.cancelled += 1;
    }
}

impl TickSource for ManualTicks {
    fn subscribe(&mut self, id: SubscriptionId) -> Box<dyn TickGuard> {
        {
            let mut state = self.lock();
            state.live.push(id);
            state.subscribed += 1;
        }
        Box::new(ManualGuard {
            id,
            state: self.state.clone(),
            done: false,
        })
    }
}

// ── Tokio source ─────────────────────────────────────────────────────

/// Tick source backed by a tokio interval task per subscription.
///
/// Ticks are sent on an unbounded channel; the receiver belongs to whoever
/// owns the engine and feeds each id back into `TimerEngine::tick`.
pub struct TokioTicks {
    runtime: Handle,
    period: Duration,
    tx: mpsc::UnboundedSender<SubscriptionId>,
}

impl TokioTicks {
    pub fn new(
        runtime: Handle,
        period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SubscriptionId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                runtime,
                period,
                tx,
            },
            rx,
        )
    }
}

struct TaskGuard(Option<JoinHandle<()>>);

impl TickGuard for TaskGuard {
    fn cancel(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

impl TickSource for TokioTicks {
    fn subscribe(&mut self, id: SubscriptionId) -> Box<dyn TickGuard> {
        let tx = self.tx.clone();
        let period = self.period;
        let handle = self.runtime.spawn(async move {
            // First tick one full period after subscribing, not immediately.
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(id).is_err() {
                    break;
                }
            }
        });
        Box::new(TaskGuard(Some(handle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_subscription_drop_cancels() {
        let mut ticks = ManualTicks::new();
        let observer = ticks.clone();
        let sub = Subscription::new(SubscriptionId(1), ticks.subscribe(SubscriptionId(1)));
        assert_eq!(observer.live(), vec![SubscriptionId(1)]);
        drop(sub);
        assert!(observer.live().is_empty());
        assert_eq!(observer.cancel_count(), 1);
    }

    #[test]
    fn manual_guard_cancel_is_idempotent() {
        let mut ticks = ManualTicks::new();
        let mut guard = ticks.subscribe(SubscriptionId(7));
        guard.cancel();
        guard.cancel();
        assert_eq!(ticks.cancel_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_ticks_arrive_once_per_period() {
        let (mut ticks, mut rx) = TokioTicks::new(Handle::current(), Duration::from_secs(1));
        let start = Instant::now();
        let _sub = Subscription::new(SubscriptionId(3), ticks.subscribe(SubscriptionId(3)));

        for _ in 0..3 {
            assert_eq!(rx.recv().await, Some(SubscriptionId(3)));
        }
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_ticks_stop_after_cancel() {
        let (mut ticks, mut rx) = TokioTicks::new(Handle::current(), Duration::from_secs(1));
        let sub = Subscription::new(SubscriptionId(4), ticks.subscribe(SubscriptionId(4)));
        assert_eq!(rx.recv().await, Some(SubscriptionId(4)));
        drop(sub);

        let waited = time::timeout(Duration::from_secs(10), rx.recv()).await;
        assert!(waited.is_err(), "tick delivered after cancellation");
    }
}
