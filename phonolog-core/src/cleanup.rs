//! Startup repair for journals written by the superseded session-scoped
//! recording scheme.
//!
//! That scheme stored `userAudioUrl` as a `blob:` object URL, which only
//! lives as long as the page session that minted it. Any such reference
//! found on disk is dangling by definition. The typed model no longer admits
//! the form (see [`crate::entry::UserAudio`]), so this pass works on the raw
//! JSON payload and must run before anything reads the store.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::entry::UserAudio;

const USER_AUDIO_FIELD: &str = "userAudioUrl";

/// Strip transient user-audio references from the persisted payload at
/// `path`, writing the corrected payload back only if something changed.
///
/// Returns the number of entries repaired. A missing, unreadable or
/// unparseable payload is left untouched and reported as zero.
pub fn clean_stale_audio_refs(path: &Path) -> usize {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return 0,
    };

    let mut payload: Value = match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("stored journal is not valid JSON, skipping cleanup: {e}");
            return 0;
        }
    };

    let Some(entries) = payload.as_array_mut() else {
        warn!("stored journal is not a JSON array, skipping cleanup");
        return 0;
    };

    let mut cleaned = 0usize;
    for entry in entries.iter_mut() {
        let Some(fields) = entry.as_object_mut() else {
            continue;
        };
        let stale = fields
            .get(USER_AUDIO_FIELD)
            .and_then(Value::as_str)
            .is_some_and(UserAudio::is_transient_ref);
        if stale {
            fields.remove(USER_AUDIO_FIELD);
            cleaned += 1;
        }
    }

    if cleaned == 0 {
        debug!("no stale user audio references found");
        return 0;
    }

    let json = match serde_json::to_string_pretty(&payload) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to re-serialize repaired journal: {e}");
            return 0;
        }
    };
    if let Err(e) = fs::write(path, json) {
        warn!("failed to write repaired journal: {e}");
        return 0;
    }

    info!(cleaned, "removed stale user audio references");
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_journal(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("entries.json");
        fs::write(&path, contents).expect("seed journal");
        (dir, path)
    }

    #[test]
    fn strips_transient_refs_and_keeps_persistable_ones() {
        let (_dir, path) = temp_journal(
            r#"[
                {"id":"a","word":"hello","difficulty":"easy",
                 "userAudioUrl":"blob:https://app.local/123",
                 "createdAt":"2024-01-01T00:00:00+00:00"},
                {"id":"b","word":"water","difficulty":"hard",
                 "userAudioUrl":"data:audio/wav;base64,AAAA",
                 "createdAt":"2024-01-01T00:00:00+00:00"}
            ]"#,
        );

        assert_eq!(clean_stale_audio_refs(&path), 1);

        let payload: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let entries = payload.as_array().unwrap();
        assert!(entries[0].get("userAudioUrl").is_none());
        assert_eq!(
            entries[1]["userAudioUrl"],
            Value::from("data:audio/wav;base64,AAAA")
        );
        // The rest of the record survives intact.
        assert_eq!(entries[0]["word"], Value::from("hello"));
    }

    #[test]
    fn clean_journal_is_not_rewritten() {
        // Compact seed: any write-back would re-format it, so byte equality
        // proves the pass did not touch the file.
        let seed = r#"[{"id":"a","word":"hello","difficulty":"easy","createdAt":"2024-01-01T00:00:00+00:00"}]"#;
        let (_dir, path) = temp_journal(seed);

        assert_eq!(clean_stale_audio_refs(&path), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), seed);
    }

    #[test]
    fn unparseable_journal_is_left_alone() {
        let (_dir, path) = temp_journal("not json {{{");
        assert_eq!(clean_stale_audio_refs(&path), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json {{{");
    }

    #[test]
    fn missing_journal_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(clean_stale_audio_refs(&dir.path().join("entries.json")), 0);
    }
}
