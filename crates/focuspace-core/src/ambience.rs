//! Ambience catalogs: background music tracks and visual effects.
//!
//! Each music track is a small playlist; the audio session loops over the
//! files of the selected track for the whole session.

use serde::Serialize;

/// Id of the track selected when the user has no saved preference.
pub const DEFAULT_TRACK_ID: &str = "5";

/// Id of the visual effect selected when the user has no saved preference.
pub const DEFAULT_EFFECT_ID: &str = "weather_sun_01";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BgmTrack {
    pub id: String,
    pub title: String,
    pub decade: String,
    /// Playlist files, relative to the configured asset root.
    pub files: Vec<String>,
    pub cover: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Sun,
    Rain,
    Snow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisualEffect {
    pub id: &'static str,
    pub label: &'static str,
    pub weather: Weather,
    /// Whether a particle overlay is drawn; sun is the plain background.
    pub animated: bool,
}

const TRACKS: [(&str, &str, &str); 9] = [
    ("1", "50s Piano Lounge", "50s"),
    ("2", "60s Bossa Chill", "60s"),
    ("3", "70s Groove Jazz", "70s"),
    ("4", "80s 8-bit Arcade", "80s"),
    ("5", "90s Lo-fi Beats", "90s"),
    ("6", "00s Chill Pop", "00s"),
    ("7", "10s Kawaii Future", "10s"),
    ("8", "20s Synthwave Neon", "20s"),
    ("9", "30s Ambient Horizon", "30s"),
];

static EFFECTS: [VisualEffect; 3] = [
    VisualEffect {
        id: "weather_sun_01",
        label: "Sun",
        weather: Weather::Sun,
        animated: false,
    },
    VisualEffect {
        id: "weather_rain_01",
        label: "Rain",
        weather: Weather::Rain,
        animated: true,
    },
    VisualEffect {
        id: "weather_snow_01",
        label: "Snow",
        weather: Weather::Snow,
        animated: true,
    },
];

/// All background music tracks, in display order.
pub fn tracks() -> Vec<BgmTrack> {
    TRACKS
        .iter()
        .map(|&(id, title, decade)| BgmTrack {
            id: id.to_string(),
            title: title.to_string(),
            decade: decade.to_string(),
            files: (1..=2)
                .map(|n| format!("sounds/bgm/{decade}/bgm_{decade}_{n:02}.mp3"))
                .collect(),
            cover: format!("images/covers/cover_{decade}.png"),
        })
        .collect()
}

pub fn find_track(id: &str) -> Option<BgmTrack> {
    tracks().into_iter().find(|t| t.id == id)
}

pub fn default_track() -> BgmTrack {
    find_track(DEFAULT_TRACK_ID)
        .or_else(|| tracks().into_iter().next())
        .unwrap_or_else(|| BgmTrack {
            id: DEFAULT_TRACK_ID.to_string(),
            title: String::new(),
            decade: String::new(),
            files: Vec::new(),
            cover: String::new(),
        })
}

pub fn effects() -> &'static [VisualEffect] {
    &EFFECTS
}

pub fn find_effect(id: &str) -> Option<&'static VisualEffect> {
    EFFECTS.iter().find(|e| e.id == id)
}

pub fn default_effect() -> &'static VisualEffect {
    find_effect(DEFAULT_EFFECT_ID).unwrap_or(&EFFECTS[0])
}
