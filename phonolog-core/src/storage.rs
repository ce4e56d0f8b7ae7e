//! JSON-file persistence for the entry collection.
//!
//! One logical collection, one file, whole-collection writes. Two processes
//! sharing the same backing file race with last-write-wins semantics and no
//! lost-update detection; the journal is single-user and this limitation is
//! accepted rather than hidden.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::entry::{now_rfc3339, Entry};
use crate::error::Result;

/// Repository seam over the persisted entry collection.
pub trait EntryStore {
    /// Every persisted entry in on-disk (insertion) order. Missing or
    /// unparseable storage reads as an empty collection, never an error.
    fn get_all(&self) -> Vec<Entry>;

    /// Insert or replace by `entry.id`, then persist the whole collection.
    ///
    /// Replacing preserves the stored `created_at` and stamps `updated_at`
    /// with the current time, overriding whatever the caller supplied for
    /// both. Inserting keeps the entry exactly as given.
    fn save(&self, entry: Entry) -> Result<()>;

    /// Remove the entry with `id` if present (no-op otherwise), then persist.
    fn delete(&self, id: &str) -> Result<()>;
}

/// [`EntryStore`] backed by a single JSON array file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn default_store_path() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Lattice Labs")
                .join("Phonolog")
                .join("entries.json")
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var_os("XDG_DATA_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| {
                    std::env::var_os("HOME")
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from("/tmp"))
                        .join(".local")
                        .join("share")
                })
                .join("phonolog")
                .join("entries.json")
        }
    }

    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, entries: &[Entry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries).map_err(std::io::Error::other)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl EntryStore for JsonFileStore {
    fn get_all(&self) -> Vec<Entry> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("journal payload unreadable, treating as empty: {e}");
                Vec::new()
            }
        }
    }

    fn save(&self, mut entry: Entry) -> Result<()> {
        let mut entries = self.get_all();
        if let Some(existing) = entries.iter_mut().find(|e| e.id == entry.id) {
            entry.created_at = existing.created_at.clone();
            entry.updated_at = Some(now_rfc3339());
            *existing = entry;
        } else {
            entries.push(entry);
        }
        self.write_all(&entries)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut entries = self.get_all();
        entries.retain(|e| e.id != id);
        self.write_all(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Difficulty;
    use chrono::DateTime;

    fn temp_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = JsonFileStore::new(dir.path().join("entries.json")).expect("create store");
        (dir, store)
    }

    fn entry(id: &str, word: &str, difficulty: Difficulty) -> Entry {
        Entry {
            id: id.into(),
            word: word.into(),
            ipa: None,
            audio_url: None,
            user_audio: None,
            notes: None,
            difficulty,
            tags: Vec::new(),
            meanings: Vec::new(),
            created_at: "2024-03-01T10:00:00+00:00".into(),
            updated_at: None,
        }
    }

    #[test]
    fn get_all_on_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn save_appends_new_entries_in_order() {
        let (_dir, store) = temp_store();
        store.save(entry("a", "hello", Difficulty::Easy)).unwrap();
        store.save(entry("b", "water", Difficulty::Hard)).unwrap();

        let all = store.get_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "a");
        assert_eq!(all[1].id, "b");
    }

    #[test]
    fn insert_keeps_caller_supplied_timestamps() {
        let (_dir, store) = temp_store();
        let mut fresh = entry("a", "hello", Difficulty::Easy);
        fresh.updated_at = Some("2024-03-02T10:00:00+00:00".into());
        store.save(fresh).unwrap();

        let all = store.get_all();
        assert_eq!(all[0].created_at, "2024-03-01T10:00:00+00:00");
        assert_eq!(all[0].updated_at.as_deref(), Some("2024-03-02T10:00:00+00:00"));
    }

    #[test]
    fn resave_replaces_in_place_and_preserves_created_at() {
        let (_dir, store) = temp_store();
        store.save(entry("a", "hello", Difficulty::Easy)).unwrap();

        let mut changed = entry("a", "hello", Difficulty::Hard);
        // A caller-supplied createdAt must not survive an update.
        changed.created_at = "1999-01-01T00:00:00+00:00".into();
        store.save(changed).unwrap();

        let all = store.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].difficulty, Difficulty::Hard);
        assert_eq!(all[0].created_at, "2024-03-01T10:00:00+00:00");

        let updated = all[0].updated_at.as_deref().expect("updatedAt stamped");
        let updated = DateTime::parse_from_rfc3339(updated).expect("valid RFC 3339");
        let created = DateTime::parse_from_rfc3339(&all[0].created_at).unwrap();
        assert!(updated >= created);
    }

    #[test]
    fn repeated_saves_keep_one_record_per_id() {
        let (_dir, store) = temp_store();
        for _ in 0..3 {
            store.save(entry("a", "hello", Difficulty::Medium)).unwrap();
        }
        store.save(entry("b", "water", Difficulty::Medium)).unwrap();
        assert_eq!(store.get_all().len(), 2);
    }

    #[test]
    fn delete_removes_matching_entry_only() {
        let (_dir, store) = temp_store();
        store.save(entry("a", "hello", Difficulty::Easy)).unwrap();
        store.save(entry("b", "water", Difficulty::Easy)).unwrap();

        store.delete("a").unwrap();
        let all = store.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "b");
    }

    #[test]
    fn delete_of_unknown_id_is_a_noop() {
        let (_dir, store) = temp_store();
        store.save(entry("a", "hello", Difficulty::Easy)).unwrap();
        store.delete("missing").unwrap();
        assert_eq!(store.get_all().len(), 1);
    }

    #[test]
    fn delete_on_empty_store_leaves_it_empty() {
        let (_dir, store) = temp_store();
        store.delete("a").unwrap();
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn corrupt_payload_reads_as_empty() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "not json {{{").unwrap();
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn update_scenario_end_to_end() {
        let (_dir, store) = temp_store();
        store.save(entry("a", "hello", Difficulty::Easy)).unwrap();

        let all = store.get_all();
        assert_eq!(all[0].created_at, "2024-03-01T10:00:00+00:00");

        store.save(entry("a", "hello", Difficulty::Hard)).unwrap();
        let all = store.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].difficulty, Difficulty::Hard);
        assert_eq!(all[0].created_at, "2024-03-01T10:00:00+00:00");
        assert!(all[0].updated_at.is_some());
    }
}
