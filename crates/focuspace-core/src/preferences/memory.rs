use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Preference, PreferenceSnapshot, ProfileStore};
use crate::error::StoreError;

#[derive(Default)]
struct Inner {
    users: HashMap<String, PreferenceSnapshot>,
    failing: bool,
    writes: usize,
}

/// In-memory profile store.
///
/// Clones share state. `set_failing(true)` makes every call fail, which is
/// how an unreachable remote store looks to the session.
#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn snapshot(&self, user_id: &str) -> PreferenceSnapshot {
        self.lock().users.get(user_id).cloned().unwrap_or_default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, user_id: &str) -> Result<PreferenceSnapshot, StoreError> {
        let inner = self.lock();
        if inner.failing {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(inner.users.get(user_id).cloned().unwrap_or_default())
    }

    fn save(&mut self, user_id: &str, preference: &Preference) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.failing {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        preference.apply(inner.users.entry(user_id.to_string()).or_default());
        inner.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_are_per_user() {
        let mut store = MemoryProfileStore::new();
        store
            .save("u1", &Preference::MusicTrack("3".into()))
            .unwrap();
        assert_eq!(store.load("u1").unwrap().music_track_id.as_deref(), Some("3"));
        assert_eq!(store.load("u2").unwrap(), PreferenceSnapshot::default());
    }

    #[test]
    fn failing_store_errors() {
        let mut store = MemoryProfileStore::new();
        store.set_failing(true);
        assert!(store.load("u1").is_err());
        assert!(store.set_duration("u1", "default_52_17").is_err());
        assert_eq!(store.writes(), 0);
    }
}
