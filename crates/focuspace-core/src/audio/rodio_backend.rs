//! rodio output backend.
//!
//! rodio's output stream is not `Send`, so a dedicated `audio-engine`
//! thread owns the stream and one `Sink` per loaded sound. The backend
//! handle talks to it over a command channel.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use rodio::source::EmptyCallback;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, warn};

use super::backend::{AudioBackend, EndedCallback, PlaybackHandle, TrackEnd};
use crate::error::AudioError;

type Callbacks = Arc<Mutex<HashMap<u64, EndedCallback>>>;

enum AudioCommand {
    Load {
        id: u64,
        path: PathBuf,
        reply: Sender<Result<(), AudioError>>,
    },
    Play(u64),
    Pause(u64),
    Resume(u64),
    Stop(u64),
    SetVolume(u64, f32),
    SetMaster(f32),
}

pub struct RodioBackend {
    asset_root: PathBuf,
    tx: Option<Sender<AudioCommand>>,
    next_id: u64,
    callbacks: Callbacks,
}

impl RodioBackend {
    /// Relative sound uris are resolved against `asset_root`.
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            tx: None,
            next_id: 0,
            callbacks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn resolve(&self, uri: &str) -> PathBuf {
        let path = Path::new(uri);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_root.join(path)
        }
    }

    fn ensure_thread(&mut self) -> Result<Sender<AudioCommand>, AudioError> {
        if let Some(tx) = &self.tx {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let callbacks = self.callbacks.clone();
        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || run_engine(rx, callbacks))
            .map_err(|e| AudioError::Playback(e.to_string()))?;

        self.tx = Some(tx.clone());
        Ok(tx)
    }

    fn send(&mut self, cmd: AudioCommand) -> Result<(), AudioError> {
        let tx = self.ensure_thread()?;
        tx.send(cmd).map_err(|_| AudioError::NoDevice)
    }
}

impl AudioBackend for RodioBackend {
    /// Blocks until the audio thread has opened and decoded the file.
    fn load(&mut self, uri: &str) -> Result<PlaybackHandle, AudioError> {
        self.next_id += 1;
        let id = self.next_id;
        let path = self.resolve(uri);
        let (reply, answer) = mpsc::channel();
        self.send(AudioCommand::Load { id, path, reply })?;
        answer
            .recv()
            .map_err(|_| AudioError::NoDevice)?
            .map_err(|e| match e {
                AudioError::Load { message, .. } => AudioError::Load {
                    uri: uri.to_string(),
                    message,
                },
                other => other,
            })?;
        Ok(PlaybackHandle(id))
    }

    fn play(&mut self, handle: PlaybackHandle) -> Result<(), AudioError> {
        self.send(AudioCommand::Play(handle.0))
    }

    fn pause(&mut self, handle: PlaybackHandle) -> Result<(), AudioError> {
        self.send(AudioCommand::Pause(handle.0))
    }

    fn resume(&mut self, handle: PlaybackHandle) -> Result<(), AudioError> {
        self.send(AudioCommand::Resume(handle.0))
    }

    fn stop(&mut self, handle: PlaybackHandle) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.remove(&handle.0);
        }
        if let Some(tx) = &self.tx {
            let _ = tx.send(AudioCommand::Stop(handle.0));
        }
    }

    fn on_ended(&mut self, handle: PlaybackHandle, callback: EndedCallback) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.insert(handle.0, callback);
        }
    }

    fn set_volume(&mut self, handle: PlaybackHandle, volume: f32) {
        let _ = self.send(AudioCommand::SetVolume(handle.0, volume));
    }

    fn set_master_volume(&mut self, volume: f32) {
        let _ = self.send(AudioCommand::SetMaster(volume));
    }
}

struct Voice {
    sink: Sink,
    volume: f32,
}

fn run_engine(rx: Receiver<AudioCommand>, callbacks: Callbacks) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            warn!(error = %e, "no audio output device, sounds are disabled");
            while let Ok(cmd) = rx.recv() {
                if let AudioCommand::Load { reply, .. } = cmd {
                    let _ = reply.send(Err(AudioError::NoDevice));
                }
            }
            return;
        }
    };

    let mut voices: HashMap<u64, Voice> = HashMap::new();
    let mut master = 1.0_f32;

    while let Ok(cmd) = rx.recv() {
        // Drop sinks whose sources have all played out.
        voices.retain(|_, v| !v.sink.empty());

        match cmd {
            AudioCommand::Load { id, path, reply } => {
                let result = open_voice(&stream_handle, &path, id, master, callbacks.clone())
                    .map(|voice| {
                        voices.insert(id, voice);
                    });
                let _ = reply.send(result);
            }
            AudioCommand::Play(id) | AudioCommand::Resume(id) => {
                if let Some(v) = voices.get(&id) {
                    v.sink.play();
                }
            }
            AudioCommand::Pause(id) => {
                if let Some(v) = voices.get(&id) {
                    v.sink.pause();
                }
            }
            AudioCommand::Stop(id) => {
                if let Some(v) = voices.remove(&id) {
                    v.sink.stop();
                }
            }
            AudioCommand::SetVolume(id, volume) => {
                if let Some(v) = voices.get_mut(&id) {
                    v.volume = volume.clamp(0.0, 1.0);
                    v.sink.set_volume(v.volume * master);
                }
            }
            AudioCommand::SetMaster(volume) => {
                master = volume.clamp(0.0, 1.0);
                for v in voices.values() {
                    v.sink.set_volume(v.volume * master);
                }
            }
        }
    }
    debug!("audio engine thread exiting");
}

fn open_voice(
    stream: &OutputStreamHandle,
    path: &Path,
    id: u64,
    master: f32,
    callbacks: Callbacks,
) -> Result<Voice, AudioError> {
    let load_error = |message: String| AudioError::Load {
        uri: path.display().to_string(),
        message,
    };
    let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| load_error(e.to_string()))?;
    let sink = Sink::try_new(stream).map_err(|e| AudioError::Playback(e.to_string()))?;
    sink.pause();
    sink.set_volume(master);
    sink.append(decoder);
    sink.append(EmptyCallback::<f32>::new(Box::new(move || {
        let callback = callbacks.lock().ok().and_then(|mut map| map.remove(&id));
        if let Some(cb) = callback {
            cb(TrackEnd::Finished);
        }
    })));
    Ok(Voice { sink, volume: 1.0 })
}
