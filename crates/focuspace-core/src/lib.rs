//! # Focuspace Core Library
//!
//! This library provides the core logic for the Focuspace focus timer: a
//! focus/rest countdown with background music, an end-of-phase chime and
//! per-user ambience preferences. The `focuspace` CLI is a thin layer over
//! the same library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A tick-driven state machine; every tick comes from a
//!   cancellable subscription owned by the engine
//! - **Audio**: A looping playlist and a one-shot chime over a pluggable backend
//! - **Session**: Wires timer transitions to audio, confirmation prompts and
//!   preference writes
//! - **Storage**: TOML configuration and a SQLite store for preferences
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Countdown state machine
//! - [`AudioSessionManager`]: Music playlist and chime playback
//! - [`SessionOrchestrator`]: One running focus session
//! - [`Config`]: Application configuration management

pub mod ambience;
pub mod audio;
pub mod durations;
pub mod error;
pub mod events;
pub mod preferences;
pub mod session;
pub mod storage;
pub mod timer;

pub use ambience::{BgmTrack, VisualEffect, Weather};
pub use audio::{AudioBackend, AudioSessionManager, AudioSettings, MemoryBackend};
pub use durations::DurationPreset;
pub use error::{AudioError, ConfigError, CoreError, StoreError, ValidationError};
pub use events::Event;
pub use preferences::{
    MemoryProfileStore, Preference, PreferenceSnapshot, PreferenceSync, ProfileStore,
    SqliteProfileStore,
};
pub use session::{Confirm, NavigationGuard, SelectOutcome, SessionOrchestrator, SessionView};
pub use storage::Config;
pub use timer::{Phase, TickOutcome, TimerEngine, TimerState};
