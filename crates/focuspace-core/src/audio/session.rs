//! Background music playlist and end-of-phase chime.
//!
//! The manager is the only thing that talks to the audio backend. Backend
//! end-of-track callbacks never touch manager state directly: they post a
//! notice on a channel, and the owner applies notices with [`AudioSessionManager::pump`].
//! Each notice also wakes [`AudioSessionManager::notices`], so an async owner
//! can pump as soon as a track ends.
//!
//! Audio is best effort. Every backend error is logged here and never
//! returned; a track that fails to load or play is skipped as if it had
//! finished.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, PlaybackHandle, TrackEnd};
use crate::error::AudioError;
use crate::storage::AudioConfig;

#[derive(Debug)]
struct Notice {
    handle: PlaybackHandle,
    end: TrackEnd,
}

/// Volumes and the chime source used by the manager.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSettings {
    pub music_volume: f32,
    pub chime_volume: f32,
    pub chime_uri: String,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self::from(&AudioConfig::default())
    }
}

impl From<&AudioConfig> for AudioSettings {
    fn from(cfg: &AudioConfig) -> Self {
        Self {
            music_volume: cfg.music_volume,
            chime_volume: cfg.chime_volume,
            chime_uri: cfg.chime_uri.clone(),
        }
    }
}

pub struct AudioSessionManager {
    backend: Box<dyn AudioBackend>,
    settings: AudioSettings,
    playlist: Vec<String>,
    current_index: usize,
    handle: Option<PlaybackHandle>,
    paused: bool,
    /// Failed track ends since the last successful one.
    failures_in_a_row: usize,
    notices_tx: Sender<Notice>,
    notices_rx: Receiver<Notice>,
    /// Woken whenever a notice is posted.
    wake: Arc<Notify>,
}

impl AudioSessionManager {
    pub fn new(backend: Box<dyn AudioBackend>, settings: AudioSettings) -> Self {
        let (notices_tx, notices_rx) = mpsc::channel();
        Self {
            backend,
            settings,
            playlist: Vec::new(),
            current_index: 0,
            handle: None,
            paused: false,
            failures_in_a_row: 0,
            notices_tx,
            notices_rx,
            wake: Arc::new(Notify::new()),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// A track is loaded and not paused.
    pub fn is_playing(&self) -> bool {
        self.handle.is_some() && !self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.handle.is_some() && self.paused
    }

    pub fn handle(&self) -> Option<PlaybackHandle> {
        self.handle
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn playlist(&self) -> &[String] {
        &self.playlist
    }

    /// Signalled each time the backend reports a track end.
    ///
    /// An async owner waits on it and answers with [`Self::pump`], so the
    /// next track starts without waiting for anything else to happen.
    pub fn notices(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    pub fn current_track(&self) -> Option<&str> {
        if self.handle.is_none() {
            return None;
        }
        self.playlist.get(self.current_index).map(String::as_str)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Bind `playlist` and start it from the first entry.
    ///
    /// Does nothing while music is actively playing. A paused playlist is
    /// replaced.
    pub fn play(&mut self, playlist: &[String]) {
        if self.is_playing() {
            debug!("play ignored, music already playing");
            return;
        }
        if playlist.is_empty() {
            warn!("play ignored, playlist is empty");
            return;
        }
        if self.handle.is_some() {
            self.stop();
        }
        self.playlist = playlist.to_vec();
        self.current_index = 0;
        self.failures_in_a_row = 0;
        info!(tracks = self.playlist.len(), "starting playlist");
        self.start_from(0, self.playlist.len());
    }

    pub fn pause(&mut self) {
        let Some(handle) = self.handle else {
            return;
        };
        if self.paused {
            return;
        }
        if let Err(e) = self.backend.pause(handle) {
            warn!(error = %e, "failed to pause music");
        }
        self.paused = true;
    }

    /// Continue a paused track where it stopped. No-op without one.
    pub fn resume(&mut self) {
        let Some(handle) = self.handle else {
            return;
        };
        if !self.paused {
            return;
        }
        self.paused = false;
        if let Err(e) = self.backend.resume(handle) {
            self.track_ended(handle, TrackEnd::Failed(e));
        }
    }

    /// Halt playback and clear the playlist. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.stop(handle);
            info!("music stopped");
        }
        self.playlist.clear();
        self.current_index = 0;
        self.paused = false;
        self.failures_in_a_row = 0;
    }

    /// Play the end-of-phase chime over whatever else is playing.
    pub fn play_chime(&mut self) {
        let uri = self.settings.chime_uri.clone();
        let handle = match self.backend.load(&uri) {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "chime unavailable");
                return;
            }
        };
        self.backend.set_volume(handle, self.settings.chime_volume);
        if let Err(e) = self.backend.play(handle) {
            warn!(error = %e, "chime playback failed");
            self.backend.stop(handle);
        }
    }

    /// Mute or unmute every sound, music and chime alike.
    pub fn set_muted(&mut self, muted: bool) {
        self.backend
            .set_master_volume(if muted { 0.0 } else { 1.0 });
        info!(muted, "audio mute changed");
    }

    /// Apply track-end notices posted by the backend.
    ///
    /// Returns how many notices advanced the playlist.
    pub fn pump(&mut self) -> usize {
        let mut advanced = 0;
        while let Ok(notice) = self.notices_rx.try_recv() {
            if self.handle == Some(notice.handle) {
                self.track_ended(notice.handle, notice.end);
                advanced += 1;
            } else {
                debug!(handle = notice.handle.0, "ignoring end of inactive sound");
            }
        }
        advanced
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn track_ended(&mut self, handle: PlaybackHandle, end: TrackEnd) {
        if self.handle != Some(handle) {
            return;
        }
        self.handle = None;
        self.paused = false;
        match end {
            TrackEnd::Finished => {
                self.failures_in_a_row = 0;
                debug!(index = self.current_index, "track finished");
            }
            TrackEnd::Failed(e) => {
                warn!(error = %e, index = self.current_index, "track failed, skipping");
                self.backend.stop(handle);
                self.failures_in_a_row += 1;
            }
        }
        if self.playlist.is_empty() {
            return;
        }
        if self.failures_in_a_row >= self.playlist.len() {
            warn!("every track in the playlist failed, stopping music");
            self.stop();
            return;
        }
        let next = (self.current_index + 1) % self.playlist.len();
        let budget = self.playlist.len() - self.failures_in_a_row;
        self.start_from(next, budget);
    }

    /// Start the first playable track at or after `index`, trying at most
    /// `attempts` entries.
    fn start_from(&mut self, mut index: usize, attempts: usize) {
        for _ in 0..attempts {
            self.current_index = index;
            let uri = self.playlist[index].clone();
            match self.start_track(&uri) {
                Ok(handle) => {
                    debug!(index, %uri, "track started");
                    self.handle = Some(handle);
                    self.paused = false;
                    return;
                }
                Err(e) => {
                    warn!(error = %e, %uri, "skipping unplayable track");
                    self.failures_in_a_row += 1;
                    index = (index + 1) % self.playlist.len();
                }
            }
        }
        warn!("no playable track in playlist, stopping music");
        self.stop();
    }

    fn start_track(&mut self, uri: &str) -> Result<PlaybackHandle, AudioError> {
        let handle = self.backend.load(uri)?;
        self.backend.set_volume(handle, self.settings.music_volume);
        let tx = self.notices_tx.clone();
        let wake = Arc::clone(&self.wake);
        self.backend.on_ended(
            handle,
            Box::new(move |end| {
                if tx.send(Notice { handle, end }).is_ok() {
                    wake.notify_one();
                }
            }),
        );
        if let Err(e) = self.backend.play(handle) {
            self.backend.stop(handle);
            return Err(e);
        }
        Ok(handle)
    }
}

impl Drop for AudioSessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}
