//! Static catalog of focus/rest duration presets.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::timer::Phase;

/// Id of the preset selected when nothing else is known.
pub const DEFAULT_PRESET_ID: &str = "default_25_5";

/// A named (focus, rest) pair a user can select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationPreset {
    pub id: String,
    pub label: String,
    pub focus_secs: u64,
    pub rest_secs: u64,
}

impl DurationPreset {
    /// Build a preset, rejecting zero-length phases.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        focus_secs: u64,
        rest_secs: u64,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if focus_secs == 0 || rest_secs == 0 {
            return Err(ValidationError::EmptyPhase { id });
        }
        Ok(Self {
            id,
            label: label.into(),
            focus_secs,
            rest_secs,
        })
    }

    /// Configured length of `phase` in seconds.
    pub fn secs_for(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Focus => self.focus_secs,
            Phase::Rest => self.rest_secs,
        }
    }
}

const PRESETS: [(&str, &str, u64, u64); 3] = [
    ("default_25_5", "25-5", 25, 5),
    ("default_52_17", "52-17", 52, 17),
    ("default_112_26", "112-26", 112, 26),
];

/// All selectable presets, in display order.
pub fn catalog() -> Vec<DurationPreset> {
    PRESETS
        .iter()
        .map(|&(id, label, focus_min, rest_min)| DurationPreset {
            id: id.to_string(),
            label: label.to_string(),
            focus_secs: focus_min * 60,
            rest_secs: rest_min * 60,
        })
        .collect()
}

/// Look up a preset by id.
pub fn find(id: &str) -> Option<DurationPreset> {
    catalog().into_iter().find(|p| p.id == id)
}

/// The preset used on first launch.
pub fn default_preset() -> DurationPreset {
    catalog()
        .into_iter()
        .find(|p| p.id == DEFAULT_PRESET_ID)
        .unwrap_or_else(|| DurationPreset {
            id: DEFAULT_PRESET_ID.to_string(),
            label: "25-5".to_string(),
            focus_secs: 1500,
            rest_secs: 300,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_durations_are_positive() {
        for preset in catalog() {
            assert!(preset.focus_secs > 0, "{} focus", preset.id);
            assert!(preset.rest_secs > 0, "{} rest", preset.id);
        }
    }

    #[test]
    fn find_known_and_unknown() {
        let p = find("default_52_17").unwrap();
        assert_eq!(p.focus_secs, 52 * 60);
        assert_eq!(p.rest_secs, 17 * 60);
        assert!(find("default_1_1").is_none());
    }

    #[test]
    fn long_preset_exceeds_an_hour() {
        let p = find("default_112_26").unwrap();
        assert_eq!(p.focus_secs, 6720);
    }

    #[test]
    fn new_rejects_zero_phase() {
        assert_eq!(
            DurationPreset::new("x", "x", 0, 5),
            Err(ValidationError::EmptyPhase { id: "x".into() })
        );
        assert!(DurationPreset::new("x", "x", 5, 0).is_err());
        assert!(DurationPreset::new("x", "x", 5, 1).is_ok());
    }

    #[test]
    fn default_is_pomodoro_classic() {
        let p = default_preset();
        assert_eq!(p.id, DEFAULT_PRESET_ID);
        assert_eq!((p.focus_secs, p.rest_secs), (1500, 300));
    }
}
