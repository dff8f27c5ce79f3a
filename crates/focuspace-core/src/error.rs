//! Core error types for focuspace-core.
//!
//! Timer and audio failures are deliberately absent from the public command
//! surface: the countdown never fails, and audio problems are logged and
//! swallowed inside the audio session. What remains are configuration,
//! validation and persistence errors.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focuspace-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Audio backend errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Profile store errors
    #[error("Profile store error: {0}")]
    Store(#[from] StoreError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be created
    #[error("Failed to prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A preset with a zero-length phase
    #[error("Preset '{id}' must have positive focus and rest durations")]
    EmptyPhase { id: String },

    /// Unknown duration preset id
    #[error("Unknown duration preset: {0}")]
    UnknownPreset(String),

    /// Unknown background music track id
    #[error("Unknown music track: {0}")]
    UnknownTrack(String),

    /// Unknown visual effect id
    #[error("Unknown visual effect: {0}")]
    UnknownEffect(String),

    /// Background image URL is blank
    #[error("Background image URL must not be empty")]
    EmptyBackground,
}

/// Audio backend errors.
///
/// These never leave the audio session manager; they exist so backends can
/// report what went wrong and the manager can log it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// The source could not be opened or decoded
    #[error("Failed to load '{uri}': {message}")]
    Load { uri: String, message: String },

    /// The output device refused playback
    #[error("Playback rejected: {0}")]
    Playback(String),

    /// The handle is not known to the backend
    #[error("Unknown playback handle {0}")]
    UnknownHandle(u64),

    /// No output device is available
    #[error("No audio output device available")]
    NoDevice,
}

/// Profile store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the store
    #[error("Failed to open profile store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Store is unavailable (remote outage, locked database)
    #[error("Profile store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Unavailable(err.to_string())
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
