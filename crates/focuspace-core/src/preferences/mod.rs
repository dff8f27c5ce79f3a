//! Per-user space settings: duration preset, background, music, effect.
//!
//! The [`ProfileStore`] trait is the seam to wherever settings live. The
//! timer only reads them when a session is mounted and writes them when the
//! user changes a selection; a failing store never affects the running
//! session (see [`PreferenceSync`]).

mod memory;
mod sqlite;
mod sync;

pub use memory::MemoryProfileStore;
pub use sqlite::SqliteProfileStore;
pub use sync::PreferenceSync;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Everything a user has chosen for their space. Missing fields fall back to
/// configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSnapshot {
    pub duration_id: Option<String>,
    pub background_url: Option<String>,
    pub music_track_id: Option<String>,
    pub visual_effect_id: Option<String>,
}

/// A single preference write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preference {
    Duration(String),
    Background(String),
    MusicTrack(String),
    VisualEffect(String),
}

impl Preference {
    pub fn value(&self) -> &str {
        match self {
            Preference::Duration(v)
            | Preference::Background(v)
            | Preference::MusicTrack(v)
            | Preference::VisualEffect(v) => v,
        }
    }

    /// Column of the `space_settings` table holding this preference.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Preference::Duration(_) => "timer_duration_id",
            Preference::Background(_) => "background_image_url",
            Preference::MusicTrack(_) => "background_music_id",
            Preference::VisualEffect(_) => "visual_effect_id",
        }
    }

    pub(crate) fn apply(&self, snapshot: &mut PreferenceSnapshot) {
        let value = Some(self.value().to_string());
        match self {
            Preference::Duration(_) => snapshot.duration_id = value,
            Preference::Background(_) => snapshot.background_url = value,
            Preference::MusicTrack(_) => snapshot.music_track_id = value,
            Preference::VisualEffect(_) => snapshot.visual_effect_id = value,
        }
    }
}

/// Persistence for per-user preferences.
pub trait ProfileStore: Send {
    /// All saved preferences of `user_id`; empty when none were saved.
    fn load(&self, user_id: &str) -> Result<PreferenceSnapshot, StoreError>;

    fn save(&mut self, user_id: &str, preference: &Preference) -> Result<(), StoreError>;

    fn duration_preference(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load(user_id)?.duration_id)
    }

    fn set_duration(&mut self, user_id: &str, preset_id: &str) -> Result<(), StoreError> {
        self.save(user_id, &Preference::Duration(preset_id.to_string()))
    }

    fn set_background(&mut self, user_id: &str, url: &str) -> Result<(), StoreError> {
        self.save(user_id, &Preference::Background(url.to_string()))
    }

    fn set_music_track(&mut self, user_id: &str, track_id: &str) -> Result<(), StoreError> {
        self.save(user_id, &Preference::MusicTrack(track_id.to_string()))
    }

    fn set_visual_effect(&mut self, user_id: &str, effect_id: &str) -> Result<(), StoreError> {
        self.save(user_id, &Preference::VisualEffect(effect_id.to_string()))
    }
}
