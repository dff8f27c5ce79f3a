mod backend;
#[cfg(feature = "rodio")]
mod rodio_backend;
mod session;

pub use backend::{
    AudioBackend, BackendCall, EndedCallback, MemoryBackend, PlaybackHandle, SilentBackend,
    SoundStatus, TrackEnd,
};
#[cfg(feature = "rodio")]
pub use rodio_backend::RodioBackend;
pub use session::{AudioSessionManager, AudioSettings};
