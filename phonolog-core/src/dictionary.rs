//! Dictionary lookup client (dictionaryapi.dev).
//!
//! Payload extraction is kept as pure functions over `serde_json::Value` so
//! the quirks of the upstream schema (phonetics with text but no audio,
//! audio but no text, a bare top-level `phonetic` fallback) are testable
//! without the network.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::entry::{Definition, Meaning};
use crate::error::{PhonologError, Result};

const DICTIONARY_API_BASE: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Pronunciation data for one word, as returned by the dictionary.
#[derive(Debug, Clone, Default)]
pub struct Pronunciation {
    pub ipa: Option<String>,
    pub audio_url: Option<String>,
    pub meanings: Vec<Meaning>,
}

/// Client for the free dictionary API.
#[derive(Debug, Clone)]
pub struct DictionaryClient {
    http: reqwest::Client,
    base_url: String,
}

impl DictionaryClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DICTIONARY_API_BASE.to_string(),
        }
    }

    /// Look up pronunciation data for `word`.
    ///
    /// # Errors
    /// - `PhonologError::WordNotFound` when the dictionary has no such word.
    /// - `PhonologError::NoPronunciationData` when the word exists but
    ///   carries neither an IPA transcription nor an audio reference.
    /// - `PhonologError::Dictionary` for any other transport or HTTP failure,
    ///   carrying the status text or the underlying message.
    pub async fn lookup(&self, word: &str) -> Result<Pronunciation> {
        let normalized = word.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(PhonologError::Dictionary("word cannot be empty".into()));
        }

        let url = format!("{}/{}", self.base_url, normalized);
        let response = self
            .http
            .get(&url)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|e| PhonologError::Dictionary(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PhonologError::WordNotFound {
                word: word.trim().to_string(),
            });
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(PhonologError::Dictionary(
                status
                    .canonical_reason()
                    .unwrap_or(status.as_str())
                    .to_string(),
            ));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PhonologError::Dictionary(e.to_string()))?;
        parse_lookup_payload(&payload)
    }
}

impl Default for DictionaryClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract IPA, audio reference and meanings from a response body.
fn parse_lookup_payload(payload: &Value) -> Result<Pronunciation> {
    let first = payload
        .as_array()
        .and_then(|entries| entries.first())
        .ok_or(PhonologError::NoPronunciationData)?;

    let mut ipa = None;
    let mut audio_url = None;
    if let Some(phonetics) = first.get("phonetics").and_then(Value::as_array) {
        // Prefer the phonetic that carries both a transcription and audio;
        // otherwise take the first of each independently.
        if let Some(both) = phonetics
            .iter()
            .find(|p| phonetic_text(p).is_some() && phonetic_audio(p).is_some())
        {
            ipa = phonetic_text(both);
            audio_url = phonetic_audio(both);
        } else {
            ipa = phonetics.iter().find_map(phonetic_text);
            audio_url = phonetics.iter().find_map(phonetic_audio);
        }
    }
    if ipa.is_none() {
        ipa = non_empty_str(first.get("phonetic"));
    }

    let meanings = parse_meanings(first);

    if ipa.is_none() && audio_url.is_none() {
        return Err(PhonologError::NoPronunciationData);
    }

    Ok(Pronunciation {
        ipa,
        audio_url,
        meanings,
    })
}

fn phonetic_text(phonetic: &Value) -> Option<String> {
    non_empty_str(phonetic.get("text"))
}

fn phonetic_audio(phonetic: &Value) -> Option<String> {
    non_empty_str(phonetic.get("audio"))
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_meanings(entry: &Value) -> Vec<Meaning> {
    let Some(meanings) = entry.get("meanings").and_then(Value::as_array) else {
        return Vec::new();
    };
    meanings
        .iter()
        .filter_map(|meaning| {
            let part_of_speech = meaning.get("partOfSpeech").and_then(Value::as_str)?;
            let definitions = meaning
                .get("definitions")
                .and_then(Value::as_array)
                .map(|definitions| definitions.iter().filter_map(parse_definition).collect())
                .unwrap_or_default();
            Some(Meaning {
                part_of_speech: part_of_speech.to_string(),
                definitions,
            })
        })
        .collect()
}

fn parse_definition(definition: &Value) -> Option<Definition> {
    Some(Definition {
        definition: definition.get("definition").and_then(Value::as_str)?.to_string(),
        example: non_empty_str(definition.get("example")),
        synonyms: string_list(definition.get("synonyms")),
        antonyms: string_list(definition.get("antonyms")),
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
