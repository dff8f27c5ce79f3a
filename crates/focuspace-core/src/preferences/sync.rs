use tracing::{debug, warn};

use super::{Preference, PreferenceSnapshot, ProfileStore};

/// Fire-and-forget bridge between a session and a [`ProfileStore`].
///
/// Anonymous sessions never touch the store. Store failures are logged and
/// reported as `false`; callers keep their in-memory state either way.
pub struct PreferenceSync {
    user_id: Option<String>,
    store: Box<dyn ProfileStore>,
}

impl PreferenceSync {
    pub fn new(store: Box<dyn ProfileStore>, user_id: Option<String>) -> Self {
        Self { user_id, store }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Saved preferences, or an empty snapshot when anonymous or on failure.
    pub fn load(&self) -> PreferenceSnapshot {
        let Some(user_id) = self.user_id.as_deref() else {
            return PreferenceSnapshot::default();
        };
        match self.store.load(user_id) {
            Ok(snapshot) => {
                debug!(user_id, ?snapshot, "preferences loaded");
                snapshot
            }
            Err(e) => {
                warn!(user_id, error = %e, "failed to load preferences, using defaults");
                PreferenceSnapshot::default()
            }
        }
    }

    /// Persist one preference. Returns whether it reached the store.
    pub fn save(&mut self, preference: Preference) -> bool {
        let Some(user_id) = self.user_id.as_deref() else {
            return false;
        };
        match self.store.save(user_id, &preference) {
            Ok(()) => {
                debug!(user_id, ?preference, "preference saved");
                true
            }
            Err(e) => {
                warn!(user_id, ?preference, error = %e, "failed to save preference");
                false
            }
        }
    }
}

impl std::fmt::Debug for PreferenceSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceSync")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::MemoryProfileStore;

    #[test]
    fn anonymous_sessions_skip_the_store() {
        let store = MemoryProfileStore::new();
        let mut sync = PreferenceSync::new(Box::new(store.clone()), None);
        assert!(!sync.save(Preference::Duration("default_52_17".into())));
        assert_eq!(sync.load(), PreferenceSnapshot::default());
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn failures_fall_back_to_defaults() {
        let store = MemoryProfileStore::new();
        let mut sync = PreferenceSync::new(Box::new(store.clone()), Some("u1".into()));
        assert!(sync.save(Preference::MusicTrack("2".into())));
        assert_eq!(sync.load().music_track_id.as_deref(), Some("2"));

        store.set_failing(true);
        assert_eq!(sync.load(), PreferenceSnapshot::default());
        assert!(!sync.save(Preference::MusicTrack("3".into())));

        store.set_failing(false);
        assert_eq!(sync.load().music_track_id.as_deref(), Some("2"));
    }
}
