//! SQLite-backed profile store.
//!
//! One row per user in `space_settings`, mirroring the settings table of
//! the hosted backend.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Preference, PreferenceSnapshot, ProfileStore};
use crate::error::{CoreError, StoreError};
use crate::storage::data_dir;

pub struct SqliteProfileStore {
    conn: Connection,
}

impl SqliteProfileStore {
    /// Open the store at `~/.config/focuspace/focuspace.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("focuspace.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS space_settings (
                user_id              TEXT PRIMARY KEY,
                timer_duration_id    TEXT,
                background_image_url TEXT,
                background_music_id  TEXT,
                visual_effect_id     TEXT,
                updated_at           TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl ProfileStore for SqliteProfileStore {
    fn load(&self, user_id: &str) -> Result<PreferenceSnapshot, StoreError> {
        let snapshot = self
            .conn
            .query_row(
                "SELECT timer_duration_id, background_image_url, background_music_id, visual_effect_id
                 FROM space_settings WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(PreferenceSnapshot {
                        duration_id: row.get(0)?,
                        background_url: row.get(1)?,
                        music_track_id: row.get(2)?,
                        visual_effect_id: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(snapshot.unwrap_or_default())
    }

    fn save(&mut self, user_id: &str, preference: &Preference) -> Result<(), StoreError> {
        let column = preference.column();
        let sql = format!(
            "INSERT INTO space_settings (user_id, {column}, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET {column} = excluded.{column}, updated_at = excluded.updated_at"
        );
        self.conn.execute(
            &sql,
            params![user_id, preference.value(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
