//! TOML-based application configuration.
//!
//! Stores:
//! - Timer defaults (preset, tick period)
//! - Audio volumes, chime source and mute state
//! - Ambience defaults for users without saved preferences
//! - Confirmation prompt wording
//!
//! Configuration is stored at `~/.config/focuspace/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::ambience::{DEFAULT_EFFECT_ID, DEFAULT_TRACK_ID};
use crate::durations::DEFAULT_PRESET_ID;
use crate::error::{ConfigError, Result};

/// Timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_preset")]
    pub default_preset: String,
    /// Length of one tick. Only lowered for demos; the countdown counts
    /// ticks, not wall-clock seconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Audio configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_music_volume")]
    pub music_volume: f32,
    #[serde(default = "default_chime_volume")]
    pub chime_volume: f32,
    #[serde(default = "default_chime_uri")]
    pub chime_uri: String,
    #[serde(default)]
    pub muted: bool,
    /// Directory relative sound paths are resolved against.
    #[serde(default = "default_asset_root")]
    pub asset_root: String,
}

/// Ambience defaults used when a user has no saved preference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbienceConfig {
    #[serde(default = "default_track")]
    pub default_track: String,
    #[serde(default = "default_effect")]
    pub default_effect: String,
    #[serde(default = "default_background")]
    pub default_background: String,
}

/// Confirmation prompt wording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "default_leave_message")]
    pub leave_message: String,
    #[serde(default = "default_duration_change_message")]
    pub duration_change_message: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focuspace/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub ambience: AmbienceConfig,
    #[serde(default)]
    pub guard: GuardConfig,
}

// Default functions
fn default_preset() -> String {
    DEFAULT_PRESET_ID.into()
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_music_volume() -> f32 {
    0.5
}
fn default_chime_volume() -> f32 {
    0.7
}
fn default_chime_uri() -> String {
    "sounds/se/se_windchime.mp3".into()
}
fn default_asset_root() -> String {
    "assets".into()
}
fn default_track() -> String {
    DEFAULT_TRACK_ID.into()
}
fn default_effect() -> String {
    DEFAULT_EFFECT_ID.into()
}
fn default_background() -> String {
    "images/backgrounds/background_01.jpg".into()
}
fn default_leave_message() -> String {
    "You might lose progress. Are you sure you want to leave this page?".into()
}
fn default_duration_change_message() -> String {
    "Changing the timer duration will reset your current session. Continue?".into()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_preset: default_preset(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            music_volume: default_music_volume(),
            chime_volume: default_chime_volume(),
            chime_uri: default_chime_uri(),
            muted: false,
            asset_root: default_asset_root(),
        }
    }
}

impl Default for AmbienceConfig {
    fn default() -> Self {
        Self {
            default_track: default_track(),
            default_effect: default_effect(),
            default_background: default_background(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            leave_message: default_leave_message(),
            duration_change_message: default_duration_change_message(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value has the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.default_preset, "default_25_5");
        assert_eq!(parsed.audio.music_volume, 0.5);
        assert_eq!(parsed.audio.chime_volume, 0.7);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[audio]\nmuted = true\n").unwrap();
        assert!(parsed.audio.muted);
        assert_eq!(parsed.audio.chime_uri, "sounds/se/se_windchime.mp3");
        assert_eq!(parsed.timer.tick_interval_ms, 1000);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("audio.muted").as_deref(), Some("false"));
        assert_eq!(cfg.get("timer.tick_interval_ms").as_deref(), Some("1000"));
        assert_eq!(cfg.get("ambience.default_track").as_deref(), Some("5"));
        assert!(cfg.get("audio.missing_key").is_none());
        assert!(cfg.get("audio").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("audio.muted", "true").unwrap();
        cfg.set("audio.music_volume", "0.25").unwrap();
        cfg.set("timer.default_preset", "default_52_17").unwrap();
        assert!(cfg.audio.muted);
        assert_eq!(cfg.audio.music_volume, 0.25);
        assert_eq!(cfg.timer.default_preset, "default_52_17");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("audio.nonexistent_key", "value"),
            Err(crate::error::CoreError::Config(ConfigError::UnknownKey(_)))
        ));
        assert!(cfg.set("", "value").is_err());
        assert!(cfg.set("audio", "value").is_err());
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("audio.muted", "not_a_bool").is_err());
        assert!(cfg.set("timer.tick_interval_ms", "soon").is_err());
        assert!(!cfg.audio.muted);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.guard.leave_message, default_leave_message());

        let mut changed = cfg.clone();
        changed.set("ambience.default_effect", "weather_snow_01").unwrap();
        changed.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.ambience.default_effect, "weather_snow_01");
    }

    #[test]
    fn load_from_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timer = [not toml").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
