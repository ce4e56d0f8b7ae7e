//! The journal data model.
//!
//! Field names serialize camelCase so journals written by earlier releases
//! parse unchanged. `UserAudio` is the one deliberate break from the old
//! layout: the legacy schema stored the user recording as a bare string that
//! was sometimes a durable data URL and sometimes a session-scoped `blob:`
//! reference, distinguished by prefix sniffing at every use site. Here the
//! type only ever holds the durable form; the transient form is dropped at
//! the deserialization boundary (and scrubbed from disk by
//! [`crate::cleanup`]).

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

use crate::audio::encode::AudioClip;

/// Prefix of the legacy session-scoped audio reference form.
pub const TRANSIENT_REF_PREFIX: &str = "blob:";

/// Subjective difficulty of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty \"{other}\", expected easy, medium or hard")),
        }
    }
}

/// One dictionary definition within a sense group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub antonyms: Vec<String>,
}

/// A dictionary sense group: part of speech plus its definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meaning {
    pub part_of_speech: String,
    pub definitions: Vec<Definition>,
}

/// The user's own recorded pronunciation.
///
/// Invariant: always a self-contained reference (a `data:` URL embedding the
/// encoded audio bytes), safe to persist and reload across sessions. The
/// legacy transient `blob:` form cannot be represented; `from_raw` refuses it
/// and the `Deserialize` impl rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserAudio(String);

impl UserAudio {
    /// Wrap a finished recording as its persistable data-URL form.
    pub fn from_clip(clip: &AudioClip) -> Self {
        Self(clip.to_data_url())
    }

    /// Accept a persisted reference string, refusing the transient form.
    pub fn from_raw(raw: String) -> Option<Self> {
        if Self::is_transient_ref(&raw) {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Whether a raw reference string is the legacy session-scoped form.
    pub fn is_transient_ref(raw: &str) -> bool {
        raw.starts_with(TRANSIENT_REF_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for UserAudio {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        UserAudio::from_raw(raw)
            .ok_or_else(|| serde::de::Error::custom("transient audio reference is not persistable"))
    }
}

/// Lenient field-level decoder: a legacy transient reference reads as absent
/// instead of failing the whole journal.
fn lenient_user_audio<'de, D>(deserializer: D) -> Result<Option<UserAudio>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(UserAudio::from_raw))
}

/// One vocabulary record tracked by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Opaque unique id, generated at creation, immutable. Merge key.
    pub id: String,
    pub word: String,
    /// Phonetic transcription from the dictionary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipa: Option<String>,
    /// Dictionary-sourced pronunciation audio URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// The user's own recording, always in the persistable form.
    #[serde(
        default,
        rename = "userAudioUrl",
        deserialize_with = "lenient_user_audio",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_audio: Option<UserAudio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Dictionary sense groups. Opaque to the store.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meanings: Vec<Meaning>,
    /// RFC 3339, set once at creation.
    pub created_at: String,
    /// RFC 3339, stamped by the store on every mutating save after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Entry {
    /// Create a fresh entry with a generated id and creation timestamp.
    pub fn new(word: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            id: new_id("word"),
            word: word.into(),
            ipa: None,
            audio_url: None,
            user_audio: None,
            notes: None,
            difficulty,
            tags: Vec::new(),
            meanings: Vec::new(),
            created_at: now_rfc3339(),
            updated_at: None,
        }
    }
}

/// Current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Generate an entry id: `{prefix}-{micros}-{rand:08x}`.
pub fn new_id(prefix: &str) -> String {
    format!(
        "{prefix}-{}-{:08x}",
        Utc::now().timestamp_micros(),
        rand::random::<u32>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_with_camel_case_fields() {
        let mut entry = Entry::new("hello", Difficulty::Easy);
        entry.audio_url = Some("https://example.org/hello.mp3".into());
        entry.tags = vec!["greeting".into()];

        let json = serde_json::to_value(&entry).expect("serialize entry");
        assert_eq!(json["word"], "hello");
        assert_eq!(json["difficulty"], "easy");
        assert_eq!(json["audioUrl"], "https://example.org/hello.mp3");
        assert!(json["createdAt"].is_string());
        // Unset optionals are omitted entirely.
        assert!(json.get("ipa").is_none());
        assert!(json.get("updatedAt").is_none());
        assert!(json.get("userAudioUrl").is_none());
    }

    #[test]
    fn legacy_transient_reference_reads_as_absent() {
        let json = serde_json::json!({
            "id": "word-1",
            "word": "hello",
            "userAudioUrl": "blob:https://app.local/1234",
            "difficulty": "medium",
            "createdAt": "2024-01-01T00:00:00+00:00"
        });
        let entry: Entry = serde_json::from_value(json).expect("deserialize entry");
        assert!(entry.user_audio.is_none());
    }

    #[test]
    fn persistable_reference_round_trips() {
        let json = serde_json::json!({
            "id": "word-2",
            "word": "water",
            "userAudioUrl": "data:audio/wav;base64,AAAA",
            "difficulty": "hard",
            "createdAt": "2024-01-01T00:00:00+00:00"
        });
        let entry: Entry = serde_json::from_value(json).expect("deserialize entry");
        let audio = entry.user_audio.as_ref().expect("user audio kept");
        assert_eq!(audio.as_str(), "data:audio/wav;base64,AAAA");

        let back = serde_json::to_value(&entry).expect("serialize entry");
        assert_eq!(back["userAudioUrl"], "data:audio/wav;base64,AAAA");
    }

    #[test]
    fn user_audio_refuses_transient_form() {
        assert!(UserAudio::from_raw("blob:https://app.local/x".into()).is_none());
        assert!(UserAudio::from_raw("data:audio/wav;base64,AAAA".into()).is_some());
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("Easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!(" HARD ".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("impossible".parse::<Difficulty>().is_err());
    }

    #[test]
    fn new_ids_are_unique() {
        let a = new_id("word");
        let b = new_id("word");
        assert_ne!(a, b);
        assert!(a.starts_with("word-"));
    }
}
