//! Audio backend seam.
//!
//! The audio session manager drives playback only through [`AudioBackend`],
//! so the real output (rodio) and the in-memory backend used for headless
//! runs and tests are interchangeable.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::AudioError;

/// Opaque handle to one loaded sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub u64);

/// How a sound stopped on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEnd {
    Finished,
    Failed(AudioError),
}

/// Invoked at most once when a sound ends without being stopped.
pub type EndedCallback = Box<dyn FnOnce(TrackEnd) + Send + 'static>;

/// Low-level playback operations.
///
/// Backends report the end of a sound exactly once through the registered
/// callback and never call it after `stop`.
pub trait AudioBackend: Send {
    /// May block while the sound is decoded.
    fn load(&mut self, uri: &str) -> Result<PlaybackHandle, AudioError>;

    fn play(&mut self, handle: PlaybackHandle) -> Result<(), AudioError>;

    fn pause(&mut self, handle: PlaybackHandle) -> Result<(), AudioError>;

    fn resume(&mut self, handle: PlaybackHandle) -> Result<(), AudioError>;

    /// Halt and release the sound. Unknown handles are ignored.
    fn stop(&mut self, handle: PlaybackHandle);

    fn on_ended(&mut self, handle: PlaybackHandle, callback: EndedCallback);

    /// Per-sound volume in `0.0..=1.0`.
    fn set_volume(&mut self, _handle: PlaybackHandle, _volume: f32) {}

    /// Global output volume in `0.0..=1.0`, applied on top of per-sound volume.
    fn set_master_volume(&mut self, _volume: f32) {}
}

// ── In-memory backend ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundStatus {
    Loaded,
    Playing,
    Paused,
    Stopped,
    Ended,
}

/// Calls recorded by [`MemoryBackend`], keyed by uri for readable asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Load(String),
    Play(String),
    Pause(String),
    Resume(String),
    Stop(String),
}

struct MemorySound {
    uri: String,
    status: SoundStatus,
    volume: f32,
    on_ended: Option<EndedCallback>,
}

struct MemoryState {
    next_id: u64,
    sounds: HashMap<u64, MemorySound>,
    calls: Vec<BackendCall>,
    failing_uris: HashSet<String>,
    reject_playback: bool,
    master_volume: f32,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            next_id: 0,
            sounds: HashMap::new(),
            calls: Vec::new(),
            failing_uris: HashSet::new(),
            reject_playback: false,
            master_volume: 1.0,
        }
    }
}

/// Backend that produces no sound and lets the caller decide when sounds
/// end or fail.
///
/// Test double for the audio session: it keeps every sound and call it has
/// seen. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every later `load` of `uri` fail.
    pub fn fail_loads(&self, uri: &str) {
        self.lock().failing_uris.insert(uri.to_string());
    }

    /// Make `play` and `resume` fail, as a browser autoplay policy would.
    pub fn reject_playback(&self, reject: bool) {
        self.lock().reject_playback = reject;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Handles of sounds currently playing, oldest first.
    pub fn playing(&self) -> Vec<(PlaybackHandle, String)> {
        let state = self.lock();
        let mut playing: Vec<_> = state
            .sounds
            .iter()
            .filter(|(_, s)| s.status == SoundStatus::Playing)
            .map(|(id, s)| (PlaybackHandle(*id), s.uri.clone()))
            .collect();
        playing.sort_by_key(|(h, _)| h.0);
        playing
    }

    pub fn status(&self, handle: PlaybackHandle) -> Option<SoundStatus> {
        self.lock().sounds.get(&handle.0).map(|s| s.status)
    }

    pub fn volume(&self, handle: PlaybackHandle) -> Option<f32> {
        self.lock().sounds.get(&handle.0).map(|s| s.volume)
    }

    pub fn master_volume(&self) -> f32 {
        self.lock().master_volume
    }

    /// Let `handle` play to its natural end. Returns whether a callback fired.
    pub fn finish(&self, handle: PlaybackHandle) -> bool {
        self.end(handle, TrackEnd::Finished)
    }

    /// Fail `handle` mid-playback. Returns whether a callback fired.
    pub fn fail(&self, handle: PlaybackHandle, message: &str) -> bool {
        self.end(handle, TrackEnd::Failed(AudioError::Playback(message.to_string())))
    }

    fn end(&self, handle: PlaybackHandle, how: TrackEnd) -> bool {
        let callback = {
            let mut state = self.lock();
            match state.sounds.get_mut(&handle.0) {
                Some(sound) if sound.status != SoundStatus::Stopped => {
                    sound.status = SoundStatus::Ended;
                    sound.on_ended.take()
                }
                _ => None,
            }
        };
        match callback {
            Some(cb) => {
                cb(how);
                true
            }
            None => false,
        }
    }

    fn transition(
        &mut self,
        handle: PlaybackHandle,
        record: fn(String) -> BackendCall,
        to: SoundStatus,
        gated: bool,
    ) -> Result<(), AudioError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let reject = gated && state.reject_playback;
        let sound = state
            .sounds
            .get_mut(&handle.0)
            .ok_or(AudioError::UnknownHandle(handle.0))?;
        let uri = sound.uri.clone();
        if reject {
            state.calls.push(record(uri));
            return Err(AudioError::Playback("playback not allowed".into()));
        }
        sound.status = to;
        state.calls.push(record(uri));
        Ok(())
    }
}

impl AudioBackend for MemoryBackend {
    fn load(&mut self, uri: &str) -> Result<PlaybackHandle, AudioError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::Load(uri.to_string()));
        if state.failing_uris.contains(uri) {
            return Err(AudioError::Load {
                uri: uri.to_string(),
                message: "decode failed".into(),
            });
        }
        state.next_id += 1;
        let id = state.next_id;
        state.sounds.insert(
            id,
            MemorySound {
                uri: uri.to_string(),
                status: SoundStatus::Loaded,
                volume: 1.0,
                on_ended: None,
            },
        );
        Ok(PlaybackHandle(id))
    }

    fn play(&mut self, handle: PlaybackHandle) -> Result<(), AudioError> {
        self.transition(handle, BackendCall::Play, SoundStatus::Playing, true)
    }

    fn pause(&mut self, handle: PlaybackHandle) -> Result<(), AudioError> {
        self.transition(handle, BackendCall::Pause, SoundStatus::Paused, false)
    }

    fn resume(&mut self, handle: PlaybackHandle) -> Result<(), AudioError> {
        self.transition(handle, BackendCall::Resume, SoundStatus::Playing, true)
    }

    fn stop(&mut self, handle: PlaybackHandle) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if let Some(sound) = state.sounds.get_mut(&handle.0) {
            sound.status = SoundStatus::Stopped;
            sound.on_ended = None;
            let uri = sound.uri.clone();
            state.calls.push(BackendCall::Stop(uri));
        }
    }

    fn on_ended(&mut self, handle: PlaybackHandle, callback: EndedCallback) {
        if let Some(sound) = self.lock().sounds.get_mut(&handle.0) {
            sound.on_ended = Some(callback);
        }
    }

    fn set_volume(&mut self, handle: PlaybackHandle, volume: f32) {
        if let Some(sound) = self.lock().sounds.get_mut(&handle.0) {
            sound.volume = volume.clamp(0.0, 1.0);
        }
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.lock().master_volume = volume.clamp(0.0, 1.0);
    }
}

/// Backend for builds without audio output.
///
/// Hands out fresh handles and keeps nothing else, so a long session uses
/// constant memory. Sounds never end, which leaves the playlist parked on
/// its current file.
#[derive(Debug, Default)]
pub struct SilentBackend {
    next_id: u64,
}

impl SilentBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for SilentBackend {
    fn load(&mut self, _uri: &str) -> Result<PlaybackHandle, AudioError> {
        self.next_id = self.next_id.wrapping_add(1);
        Ok(PlaybackHandle(self.next_id))
    }

    fn play(&mut self, _handle: PlaybackHandle) -> Result<(), AudioError> {
        Ok(())
    }

    fn pause(&mut self, _handle: PlaybackHandle) -> Result<(), AudioError> {
        Ok(())
    }

    fn resume(&mut self, _handle: PlaybackHandle) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop(&mut self, _handle: PlaybackHandle) {}

    fn on_ended(&mut self, _handle: PlaybackHandle, _callback: EndedCallback) {}
}
