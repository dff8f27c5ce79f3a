//! Timer engine implementation.
//!
//! The engine is a tick-driven countdown state machine over two phases. It
//! owns a [`TickSource`] and holds at most one live [`Subscription`]: the
//! engine is running exactly when it holds one. Ticks carry the id of the
//! subscription that produced them, and ticks for any other id are ignored,
//! so nothing can move the countdown after a pause, reset or duration change.
//!
//! ## State Transitions
//!
//! ```text
//! Focus(paused) <-> Focus(running)
//!                       | phase end
//!                       v
//! Rest(paused)  <-> Rest(running)
//!                       | phase end
//!                       v
//!                 Focus(running) ...
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(preset, Box::new(ticks));
//! engine.toggle();
//! // For every tick delivered by the source:
//! engine.tick(id);
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::phase::{format_clock, Phase};
use super::ticker::{Subscription, SubscriptionId, TickSource};
use crate::durations::DurationPreset;
use crate::events::Event;

/// Serializable view of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_secs: u64,
    pub phase: Phase,
    pub running: bool,
    pub has_started: bool,
    pub preset_id: String,
}

/// Result of feeding one tick into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belonged to a cancelled subscription.
    Stale,
    /// One second elapsed; the phase continues.
    Counted { remaining_secs: u64 },
    /// The phase ran out and `next` has been loaded.
    PhaseEnded {
        ended: Phase,
        next: Phase,
        remaining_secs: u64,
    },
}

impl TickOutcome {
    pub fn is_phase_end(&self) -> bool {
        matches!(self, TickOutcome::PhaseEnded { .. })
    }

    pub fn into_event(self) -> Option<Event> {
        match self {
            TickOutcome::PhaseEnded {
                ended,
                next,
                remaining_secs,
            } => Some(Event::PhaseEnded {
                ended,
                next,
                remaining_secs,
                at: Utc::now(),
            }),
            _ => None,
        }
    }
}

/// Core timer engine.
pub struct TimerEngine {
    preset: DurationPreset,
    phase: Phase,
    remaining_secs: u64,
    /// Phase ends since the preset was bound.
    completed_phases: u32,
    ticks: Box<dyn TickSource>,
    subscription: Option<Subscription>,
    next_id: u64,
}

impl TimerEngine {
    /// Create a paused engine at the start of the focus phase.
    pub fn new(preset: DurationPreset, ticks: Box<dyn TickSource>) -> Self {
        Self {
            remaining_secs: preset.focus_secs,
            preset,
            phase: Phase::Focus,
            completed_phases: 0,
            ticks,
            subscription: None,
            next_id: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn preset(&self) -> &DurationPreset {
        &self.preset
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn completed_phases(&self) -> u32 {
        self.completed_phases
    }

    /// Id of the live tick subscription, if running.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription.as_ref().map(Subscription::id)
    }

    /// Configured length of the current phase.
    pub fn phase_secs(&self) -> u64 {
        self.preset.secs_for(self.phase)
    }

    /// Whether the session has made progress worth protecting.
    ///
    /// True once the current phase has counted down at all, or once any
    /// phase has ended since the preset was selected.
    pub fn has_started(&self) -> bool {
        self.completed_phases > 0 || self.remaining_secs < self.phase_secs()
    }

    pub fn clock(&self) -> String {
        format_clock(self.remaining_secs)
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            remaining_secs: self.remaining_secs,
            phase: self.phase,
            running: self.is_running(),
            has_started: self.has_started(),
            preset_id: self.preset.id.clone(),
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            running: self.is_running(),
            has_started: self.has_started(),
            preset_id: self.preset.id.clone(),
            clock: self.clock(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start when paused, pause when running.
    pub fn toggle(&mut self) -> Event {
        if self.is_running() {
            self.unsubscribe();
            info!(phase = ?self.phase, remaining = self.remaining_secs, "timer paused");
            Event::TimerPaused {
                phase: self.phase,
                remaining_secs: self.remaining_secs,
                at: Utc::now(),
            }
        } else {
            self.subscribe();
            info!(phase = ?self.phase, remaining = self.remaining_secs, "timer started");
            Event::TimerStarted {
                phase: self.phase,
                remaining_secs: self.remaining_secs,
                at: Utc::now(),
            }
        }
    }

    /// Advance the countdown by one second for subscription `id`.
    pub fn tick(&mut self, id: SubscriptionId) -> TickOutcome {
        if self.subscription_id() != Some(id) {
            debug!(id = id.0, "dropping stale tick");
            return TickOutcome::Stale;
        }

        if self.remaining_secs > 1 {
            self.remaining_secs -= 1;
            return TickOutcome::Counted {
                remaining_secs: self.remaining_secs,
            };
        }

        // The phase is over. Release the stream before flipping so no tick
        // of the finished phase can touch the new one.
        self.unsubscribe();
        let ended = self.phase;
        self.phase = ended.next();
        self.remaining_secs = self.phase_secs();
        self.completed_phases = self.completed_phases.saturating_add(1);
        self.subscribe();

        info!(?ended, next = ?self.phase, remaining = self.remaining_secs, "phase ended");
        TickOutcome::PhaseEnded {
            ended,
            next: self.phase,
            remaining_secs: self.remaining_secs,
        }
    }

    /// Stop and restart the current phase.
    pub fn reset(&mut self) -> Event {
        self.unsubscribe();
        self.remaining_secs = self.phase_secs();
        info!(phase = ?self.phase, remaining = self.remaining_secs, "timer reset");
        Event::TimerReset {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        }
    }

    /// Bind a different preset and start over at a paused focus phase.
    ///
    /// Returns `None` when `preset` is already active. Asking the user
    /// whether an in-progress session may be discarded is the caller's job.
    pub fn change_duration(&mut self, preset: DurationPreset) -> Option<Event> {
        if preset.id == self.preset.id {
            return None;
        }
        self.unsubscribe();
        let from = std::mem::replace(&mut self.preset, preset);
        self.phase = Phase::Focus;
        self.remaining_secs = self.preset.focus_secs;
        self.completed_phases = 0;
        info!(from = %from.id, to = %self.preset.id, "duration preset changed");
        Some(Event::DurationChanged {
            from: from.id,
            to: self.preset.id.clone(),
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn subscribe(&mut self) {
        if self.subscription.is_some() {
            return;
        }
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let guard = self.ticks.subscribe(id);
        self.subscription = Some(Subscription::new(id, guard));
    }

    fn unsubscribe(&mut self) {
        // Dropping the subscription cancels the underlying stream.
        self.subscription = None;
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("preset", &self.preset.id)
            .field("phase", &self.phase)
            .field("remaining_secs", &self.remaining_secs)
            .field("completed_phases", &self.completed_phases)
            .field("subscription", &self.subscription)
            .finish()
    }
}
