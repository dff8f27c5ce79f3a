use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Every state change of a focus session produces an Event.
/// The CLI prints them as JSON; the orchestrator logs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A phase ran out; `next` is already loaded and counting.
    PhaseEnded {
        ended: Phase,
        next: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// The current phase was restarted.
    TimerReset {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    DurationChanged {
        from: String,
        to: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TrackChanged {
        track_id: String,
        at: DateTime<Utc>,
    },
    BackgroundChanged {
        url: String,
        at: DateTime<Utc>,
    },
    EffectChanged {
        effect_id: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        remaining_secs: u64,
        running: bool,
        has_started: bool,
        preset_id: String,
        clock: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Tag name as it appears in the serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "TimerStarted",
            Event::TimerPaused { .. } => "TimerPaused",
            Event::PhaseEnded { .. } => "PhaseEnded",
            Event::TimerReset { .. } => "TimerReset",
            Event::DurationChanged { .. } => "DurationChanged",
            Event::TrackChanged { .. } => "TrackChanged",
            Event::BackgroundChanged { .. } => "BackgroundChanged",
            Event::EffectChanged { .. } => "EffectChanged",
            Event::StateSnapshot { .. } => "StateSnapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::PhaseEnded {
            ended: Phase::Focus,
            next: Phase::Rest,
            remaining_secs: 300,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PhaseEnded");
        assert_eq!(json["ended"], "focus");
        assert_eq!(json["next"], "rest");
        assert_eq!(event.kind(), "PhaseEnded");
    }
}
