//! Session orchestrator.
//!
//! Owns one timer engine, one audio session and the preference sync of the
//! signed-in user, and keeps them consistent:
//!
//! - starting the timer starts (or resumes) the selected music,
//! - pausing it pauses the music,
//! - every phase end rings the chime while the music keeps looping,
//! - reset and preset changes stop the music,
//! - selections are persisted, and a failing store never undoes them.
//!
//! All state changes happen synchronously on the owner's task. Ticks and
//! audio notices are fed in by the owner's event loop.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::guard::{Confirm, NavigationGuard};
use super::title::session_title;
use crate::ambience::{self, BgmTrack, VisualEffect};
use crate::audio::AudioSessionManager;
use crate::durations::{self, DurationPreset};
use crate::error::ValidationError;
use crate::events::Event;
use crate::preferences::{Preference, PreferenceSnapshot, PreferenceSync};
use crate::storage::Config;
use crate::timer::{Phase, SubscriptionId, TickOutcome, TickSource, TimerEngine};

/// Result of a user selection.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    Changed(Event),
    /// Already selected; nothing happened.
    Unchanged,
    /// The user declined to discard the running session.
    Declined,
    Rejected(ValidationError),
}

impl SelectOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, SelectOutcome::Changed(_))
    }
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub remaining_secs: u64,
    pub phase: Phase,
    pub running: bool,
    pub has_started: bool,
    pub clock: String,
    pub title: String,
    pub preset_id: String,
    pub track_id: String,
    pub background_url: String,
    pub effect_id: String,
}

/// Everything a session needs besides its configuration.
pub struct SessionParts {
    pub ticks: Box<dyn TickSource>,
    pub audio: AudioSessionManager,
    pub prefs: PreferenceSync,
    pub confirm: Box<dyn Confirm>,
}

pub struct SessionOrchestrator {
    engine: TimerEngine,
    audio: AudioSessionManager,
    prefs: PreferenceSync,
    confirm: Box<dyn Confirm>,
    guard: NavigationGuard,
    track: BgmTrack,
    background_url: String,
    effect: &'static VisualEffect,
}

impl SessionOrchestrator {
    /// Build a paused session from the user's saved preferences.
    ///
    /// Missing or unknown saved ids fall back to the configured defaults,
    /// then to the catalog defaults.
    pub fn mount(config: &Config, parts: SessionParts) -> Self {
        let SessionParts {
            ticks,
            mut audio,
            prefs,
            confirm,
        } = parts;
        let snapshot = prefs.load();

        let preset = resolve_preset(&snapshot, config);
        let track = resolve_track(&snapshot, config);
        let effect = resolve_effect(&snapshot, config);
        let background_url = snapshot
            .background_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| config.ambience.default_background.clone());

        if config.audio.muted {
            audio.set_muted(true);
        }

        info!(
            user = prefs.user_id().unwrap_or("anonymous"),
            preset = %preset.id,
            track = %track.id,
            effect = effect.id,
            "session mounted"
        );

        Self {
            engine: TimerEngine::new(preset, ticks),
            audio,
            prefs,
            confirm,
            guard: NavigationGuard::from(&config.guard),
            track,
            background_url,
            effect,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn audio(&self) -> &AudioSessionManager {
        &self.audio
    }

    pub fn track(&self) -> &BgmTrack {
        &self.track
    }

    pub fn effect(&self) -> &'static VisualEffect {
        self.effect
    }

    pub fn background_url(&self) -> &str {
        &self.background_url
    }

    pub fn has_started(&self) -> bool {
        self.engine.has_started()
    }

    pub fn title(&self) -> String {
        session_title(
            self.engine.has_started(),
            self.engine.phase(),
            self.engine.remaining_secs(),
        )
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            remaining_secs: self.engine.remaining_secs(),
            phase: self.engine.phase(),
            running: self.engine.is_running(),
            has_started: self.engine.has_started(),
            clock: self.engine.clock(),
            title: self.title(),
            preset_id: self.engine.preset().id.clone(),
            track_id: self.track.id.clone(),
            background_url: self.background_url.clone(),
            effect_id: self.effect.id.to_string(),
        }
    }

    // ── Timer ────────────────────────────────────────────────────────

    /// Start or pause the timer, and the music with it.
    pub fn toggle(&mut self) -> Event {
        let event = self.engine.toggle();
        if self.engine.is_running() {
            if self.audio.is_paused() {
                self.audio.resume();
            } else {
                self.audio.play(&self.track.files);
            }
        } else {
            self.audio.pause();
        }
        event
    }

    /// Restart the current phase and stop the music.
    pub fn reset(&mut self) -> Event {
        let event = self.engine.reset();
        self.audio.stop();
        event
    }

    /// Feed one tick from the tick source.
    pub fn on_tick(&mut self, id: SubscriptionId) -> TickOutcome {
        let outcome = self.engine.tick(id);
        if outcome.is_phase_end() {
            self.audio.play_chime();
        }
        self.audio.pump();
        outcome
    }

    /// Apply pending end-of-track notices from the audio backend.
    pub fn pump_audio(&mut self) -> usize {
        self.audio.pump()
    }

    /// Woken when a track ends; answer with [`Self::pump_audio`].
    pub fn audio_notices(&self) -> Arc<Notify> {
        self.audio.notices()
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.audio.set_muted(muted);
    }

    // ── Selections ───────────────────────────────────────────────────

    /// Switch to another duration preset.
    ///
    /// A started session is only discarded after confirmation.
    pub fn select_duration(&mut self, id: &str) -> SelectOutcome {
        let Some(preset) = durations::find(id) else {
            warn!(id, "rejected unknown duration preset");
            return SelectOutcome::Rejected(ValidationError::UnknownPreset(id.to_string()));
        };
        if preset.id == self.engine.preset().id {
            return SelectOutcome::Unchanged;
        }
        if !self
            .guard
            .allow_duration_change(self.engine.has_started(), self.confirm.as_mut())
        {
            info!(id, "duration change declined");
            return SelectOutcome::Declined;
        }

        let Some(event) = self.engine.change_duration(preset) else {
            return SelectOutcome::Unchanged;
        };
        self.audio.stop();
        self.prefs.save(Preference::Duration(id.to_string()));
        SelectOutcome::Changed(event)
    }

    /// Switch background music. A running session switches immediately.
    pub fn select_track(&mut self, id: &str) -> SelectOutcome {
        let Some(track) = ambience::find_track(id) else {
            warn!(id, "rejected unknown music track");
            return SelectOutcome::Rejected(ValidationError::UnknownTrack(id.to_string()));
        };
        if track.id == self.track.id {
            return SelectOutcome::Unchanged;
        }
        self.track = track;
        self.prefs.save(Preference::MusicTrack(id.to_string()));

        if self.engine.is_running() {
            self.audio.stop();
            self.audio.play(&self.track.files);
        } else if self.audio.handle().is_some() {
            // Paused: the next start plays the new track from the top.
            self.audio.stop();
        }
        info!(track = %self.track.id, title = %self.track.title, "music track changed");
        SelectOutcome::Changed(Event::TrackChanged {
            track_id: self.track.id.clone(),
            at: Utc::now(),
        })
    }

    pub fn select_background(&mut self, url: &str) -> SelectOutcome {
        let url = url.trim();
        if url.is_empty() {
            warn!("rejected empty background url");
            return SelectOutcome::Rejected(ValidationError::EmptyBackground);
        }
        if url == self.background_url {
            return SelectOutcome::Unchanged;
        }
        self.background_url = url.to_string();
        self.prefs.save(Preference::Background(self.background_url.clone()));
        debug!(url, "background changed");
        SelectOutcome::Changed(Event::BackgroundChanged {
            url: self.background_url.clone(),
            at: Utc::now(),
        })
    }

    pub fn select_effect(&mut self, id: &str) -> SelectOutcome {
        let Some(effect) = ambience::find_effect(id) else {
            warn!(id, "rejected unknown visual effect");
            return SelectOutcome::Rejected(ValidationError::UnknownEffect(id.to_string()));
        };
        if effect.id == self.effect.id {
            return SelectOutcome::Unchanged;
        }
        self.effect = effect;
        self.prefs.save(Preference::VisualEffect(id.to_string()));
        debug!(effect = effect.id, "visual effect changed");
        SelectOutcome::Changed(Event::EffectChanged {
            effect_id: effect.id.to_string(),
            at: Utc::now(),
        })
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// Whether the user may leave. A started session asks first.
    pub fn request_leave(&mut self) -> bool {
        self.guard
            .allow_leave(self.engine.has_started(), self.confirm.as_mut())
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        // The engine cancels its subscription when it is dropped.
        self.audio.stop();
        debug!("session unmounted");
    }
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("engine", &self.engine)
            .field("track", &self.track.id)
            .field("effect", &self.effect.id)
            .field("prefs", &self.prefs)
            .finish_non_exhaustive()
    }
}

fn resolve_preset(snapshot: &PreferenceSnapshot, config: &Config) -> DurationPreset {
    if let Some(id) = snapshot.duration_id.as_deref() {
        match durations::find(id) {
            Some(preset) => return preset,
            None => warn!(id, "saved duration preset is unknown, using default"),
        }
    }
    durations::find(&config.timer.default_preset).unwrap_or_else(|| {
        warn!(id = %config.timer.default_preset, "configured preset is unknown");
        durations::default_preset()
    })
}

fn resolve_track(snapshot: &PreferenceSnapshot, config: &Config) -> BgmTrack {
    if let Some(id) = snapshot.music_track_id.as_deref() {
        match ambience::find_track(id) {
            Some(track) => return track,
            None => warn!(id, "saved music track is unknown, using default"),
        }
    }
    ambience::find_track(&config.ambience.default_track).unwrap_or_else(|| {
        warn!(id = %config.ambience.default_track, "configured track is unknown");
        ambience::default_track()
    })
}

fn resolve_effect(snapshot: &PreferenceSnapshot, config: &Config) -> &'static VisualEffect {
    if let Some(id) = snapshot.visual_effect_id.as_deref() {
        match ambience::find_effect(id) {
            Some(effect) => return effect,
            None => warn!(id, "saved visual effect is unknown, using default"),
        }
    }
    ambience::find_effect(&config.ambience.default_effect).unwrap_or_else(|| {
        warn!(id = %config.ambience.default_effect, "configured effect is unknown");
        ambience::default_effect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioSettings, MemoryBackend};
    use crate::preferences::{MemoryProfileStore, ProfileStore};
    use crate::timer::ManualTicks;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Harness {
        session: SessionOrchestrator,
        ticks: ManualTicks,
        backend: MemoryBackend,
        store: MemoryProfileStore,
        asked: Arc<AtomicUsize>,
    }

    fn harness_with(store: MemoryProfileStore, answer: bool) -> Harness {
        let ticks = ManualTicks::new();
        let backend = MemoryBackend::new();
        let asked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&asked);
        let parts = SessionParts {
            ticks: Box::new(ticks.clone()),
            audio: AudioSessionManager::new(Box::new(backend.clone()), AudioSettings::default()),
            prefs: PreferenceSync::new(Box::new(store.clone()), Some("u1".into())),
            confirm: Box::new(move |_: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
                answer
            }),
        };
        Harness {
            session: SessionOrchestrator::mount(&Config::default(), parts),
            ticks,
            backend,
            store,
            asked,
        }
    }

    fn harness(answer: bool) -> Harness {
        harness_with(MemoryProfileStore::new(), answer)
    }

    fn tick(h: &mut Harness) -> TickOutcome {
        let id = h.ticks.current().expect("live subscription");
        h.session.on_tick(id)
    }

    fn music(h: &Harness) -> Vec<String> {
        h.backend
            .playing()
            .into_iter()
            .map(|(_, uri)| uri)
            .filter(|uri| uri.starts_with("sounds/bgm"))
            .collect()
    }

    #[test]
    fn mount_uses_defaults_without_preferences() {
        let h = harness(true);
        let view = h.session.view();
        assert_eq!(view.preset_id, "default_25_5");
        assert_eq!(view.track_id, "5");
        assert_eq!(view.effect_id, "weather_sun_01");
        assert_eq!(view.remaining_secs, 1500);
        assert_eq!(view.title, "Focuspace");
        assert!(!view.running);
    }

    #[test]
    fn mount_applies_saved_preferences_and_skips_unknown_ids() {
        let store = MemoryProfileStore::new();
        let mut writer = store.clone();
        writer.set_duration("u1", "default_52_17").unwrap();
        writer.set_music_track("u1", "404").unwrap();
        writer.set_visual_effect("u1", "weather_snow_01").unwrap();

        let h = harness_with(store, true);
        assert_eq!(h.session.view().preset_id, "default_52_17");
        assert_eq!(h.session.view().remaining_secs, 3120);
        assert_eq!(h.session.track().id, "5");
        assert_eq!(h.session.effect().id, "weather_snow_01");
    }

    #[test]
    fn toggle_plays_then_pauses_then_resumes_music() {
        let mut h = harness(true);
        h.session.toggle();
        assert_eq!(music(&h), vec!["sounds/bgm/90s/bgm_90s_01.mp3".to_string()]);

        h.session.toggle();
        assert!(music(&h).is_empty());
        assert!(h.session.audio().is_paused());

        h.session.toggle();
        assert_eq!(music(&h).len(), 1);
        assert_eq!(h.session.audio().current_index(), 0);
    }

    #[test]
    fn phase_end_chimes_and_keeps_music() {
        let mut h = harness(true);
        h.session.toggle();
        for _ in 0..1499 {
            assert!(!tick(&mut h).is_phase_end());
        }
        assert!(tick(&mut h).is_phase_end());

        let view = h.session.view();
        assert_eq!(view.phase, Phase::Rest);
        assert_eq!(view.remaining_secs, 300);
        assert!(view.running);
        assert_eq!(view.title, "05:00 | Resting...");

        let playing = h.backend.playing();
        assert!(playing.iter().any(|(_, uri)| uri == "sounds/se/se_windchime.mp3"));
        assert_eq!(music(&h).len(), 1);
    }

    #[test]
    fn track_end_starts_next_file_without_a_tick() {
        let mut h = harness(true);
        let notices = h.session.audio_notices();
        h.session.toggle();
        let first = h.session.audio().handle().unwrap();
        assert!(h.backend.finish(first));

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            tokio::time::timeout(std::time::Duration::from_secs(1), notices.notified())
                .await
                .expect("track end signalled");
        });
        assert_eq!(h.session.pump_audio(), 1);
        assert_eq!(music(&h), vec!["sounds/bgm/90s/bgm_90s_02.mp3".to_string()]);
        assert_eq!(h.session.view().remaining_secs, 1500);
    }

    #[test]
    fn reset_stops_music_and_restores_phase() {
        let mut h = harness(true);
        h.session.toggle();
        tick(&mut h);
        h.session.reset();
        assert!(music(&h).is_empty());
        assert!(h.session.audio().playlist().is_empty());
        assert_eq!(h.session.view().remaining_secs, 1500);
        assert!(!h.session.view().running);
        assert!(h.ticks.live().is_empty());
    }

    #[test]
    fn unknown_duration_is_rejected() {
        let mut h = harness(true);
        let outcome = h.session.select_duration("default_1_1");
        let reported = outcome.clone();
        assert_eq!(
            outcome,
            SelectOutcome::Rejected(ValidationError::UnknownPreset("default_1_1".into()))
        );
        assert_eq!(reported, outcome);
        assert_eq!(h.session.view().preset_id, "default_25_5");
        assert_eq!(h.store.writes(), 0);
    }

    #[test]
    fn fresh_session_changes_duration_without_asking() {
        let mut h = harness(false);
        assert!(h.session.select_duration("default_52_17").is_changed());
        assert_eq!(h.asked.load(Ordering::SeqCst), 0);
        assert_eq!(h.session.view().remaining_secs, 3120);
        assert_eq!(
            h.store.snapshot("u1").duration_id.as_deref(),
            Some("default_52_17")
        );
    }

    #[test]
    fn declined_duration_change_leaves_everything_running() {
        let mut h = harness(false);
        h.session.toggle();
        tick(&mut h);
        let before = h.session.view();

        assert_eq!(h.session.select_duration("default_52_17"), SelectOutcome::Declined);
        assert_eq!(h.asked.load(Ordering::SeqCst), 1);
        assert_eq!(h.session.view(), before);
        assert_eq!(music(&h).len(), 1);
        assert_eq!(h.store.writes(), 0);
        assert!(!tick(&mut h).is_phase_end());
    }

    #[test]
    fn confirmed_duration_change_resets_and_stops_music() {
        let mut h = harness(true);
        h.session.toggle();
        tick(&mut h);

        assert!(h.session.select_duration("default_112_26").is_changed());
        let view = h.session.view();
        assert_eq!(view.remaining_secs, 6720);
        assert_eq!(view.phase, Phase::Focus);
        assert!(!view.running);
        assert!(!view.has_started);
        assert!(music(&h).is_empty());
        assert!(h.ticks.live().is_empty());
    }

    #[test]
    fn failed_save_keeps_local_change() {
        let mut h = harness(true);
        h.store.set_failing(true);
        assert!(h.session.select_duration("default_52_17").is_changed());
        assert_eq!(h.session.view().preset_id, "default_52_17");
        assert_eq!(h.store.writes(), 0);
    }

    #[test]
    fn track_change_while_running_switches_immediately() {
        let mut h = harness(true);
        h.session.toggle();
        assert!(h.session.select_track("2").is_changed());
        assert_eq!(music(&h), vec!["sounds/bgm/60s/bgm_60s_01.mp3".to_string()]);
        assert_eq!(h.store.snapshot("u1").music_track_id.as_deref(), Some("2"));
    }

    #[test]
    fn track_change_while_paused_applies_on_next_start() {
        let mut h = harness(true);
        h.session.toggle();
        h.session.toggle();
        h.session.select_track("8");
        assert!(h.session.audio().handle().is_none());

        h.session.toggle();
        assert_eq!(music(&h), vec!["sounds/bgm/20s/bgm_20s_01.mp3".to_string()]);
    }

    #[test]
    fn effect_and_background_are_validated_and_saved() {
        let mut h = harness(true);
        assert!(matches!(
            h.session.select_effect("weather_fog_01"),
            SelectOutcome::Rejected(ValidationError::UnknownEffect(_))
        ));
        assert!(h.session.select_effect("weather_rain_01").is_changed());
        assert_eq!(h.session.select_effect("weather_rain_01"), SelectOutcome::Unchanged);
        assert_eq!(
            h.session.select_background("  "),
            SelectOutcome::Rejected(ValidationError::EmptyBackground)
        );
        assert!(h.session.select_background("images/backgrounds/background_03.jpg").is_changed());

        let saved = h.store.snapshot("u1");
        assert_eq!(saved.visual_effect_id.as_deref(), Some("weather_rain_01"));
        assert_eq!(
            saved.background_url.as_deref(),
            Some("images/backgrounds/background_03.jpg")
        );
    }

    #[test]
    fn leaving_asks_only_after_start() {
        let mut h = harness(false);
        assert!(h.session.request_leave());
        h.session.toggle();
        tick(&mut h);
        assert!(!h.session.request_leave());
        assert_eq!(h.asked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_cancels_ticks_and_stops_music() {
        let h = harness(true);
        let Harness {
            mut session,
            ticks,
            backend,
            ..
        } = h;
        session.toggle();
        assert_eq!(ticks.live().len(), 1);
        drop(session);
        assert!(ticks.live().is_empty());
        assert!(backend.playing().is_empty());
    }
}
