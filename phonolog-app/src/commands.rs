//! Subcommand handlers.
//!
//! Each handler prints its own output and returns an error only for failures
//! the user should see; main maps those to exit code 1.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use phonolog_core::{
    audio::device::list_input_devices, suggest, AudioClip, DictionaryClient, Difficulty, Entry,
    EntryStore, JsonFileStore, Recorder, RecorderEvent, UserAudio,
};
use tracing::info;

use crate::settings::{save_settings, AppSettings};

pub async fn add(
    store: &JsonFileStore,
    settings: &AppSettings,
    word: String,
    difficulty: Option<Difficulty>,
    notes: Option<String>,
    tags: Vec<String>,
    lookup: bool,
) -> Result<()> {
    let word = word.trim().to_string();
    if word.is_empty() {
        bail!("word cannot be empty");
    }

    let mut entry = Entry::new(word.clone(), difficulty.unwrap_or(settings.default_difficulty));
    entry.notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    entry.tags = tags;

    if lookup {
        match DictionaryClient::new().lookup(&word).await {
            Ok(data) => {
                entry.ipa = data.ipa;
                entry.audio_url = data.audio_url;
                entry.meanings = data.meanings;
            }
            // The entry is still worth keeping without dictionary data.
            Err(e) => eprintln!("dictionary lookup failed: {e}"),
        }
    }

    let id = entry.id.clone();
    store.save(entry)?;
    println!("added \"{word}\" ({id})");
    Ok(())
}

pub fn list(
    store: &JsonFileStore,
    difficulty: Option<Difficulty>,
    tag: Option<String>,
    search: Option<String>,
) -> Result<()> {
    let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
    let entries: Vec<Entry> = store
        .get_all()
        .into_iter()
        .filter(|e| difficulty.map_or(true, |d| e.difficulty == d))
        .filter(|e| {
            tag.as_ref()
                .map_or(true, |t| e.tags.iter().any(|x| x.eq_ignore_ascii_case(t)))
        })
        .filter(|e| {
            needle
                .as_ref()
                .map_or(true, |n| e.word.to_lowercase().contains(n.as_str()))
        })
        .collect();

    if entries.is_empty() {
        println!("no entries");
        return Ok(());
    }

    for entry in &entries {
        let mut line = format!("{}  {}", entry.id, entry.word);
        if let Some(ipa) = &entry.ipa {
            line.push_str(&format!(" {ipa}"));
        }
        line.push_str(&format!(" [{}]", entry.difficulty));
        if !entry.tags.is_empty() {
            line.push_str(&format!(" #{}", entry.tags.join(" #")));
        }
        if entry.audio_url.is_some() {
            line.push_str(" (dict audio)");
        }
        if entry.user_audio.is_some() {
            line.push_str(" (own audio)");
        }
        println!("{line}");
        if let Some(notes) = &entry.notes {
            println!("    {notes}");
        }
    }
    Ok(())
}

pub fn update(
    store: &JsonFileStore,
    id: String,
    difficulty: Option<Difficulty>,
    notes: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let mut entry = find_entry(store, &id)?;
    if let Some(difficulty) = difficulty {
        entry.difficulty = difficulty;
    }
    if let Some(notes) = notes {
        let trimmed = notes.trim().to_string();
        entry.notes = (!trimmed.is_empty()).then_some(trimmed);
    }
    if !tags.is_empty() {
        entry.tags = tags;
    }

    let word = entry.word.clone();
    store.save(entry)?;
    println!("updated \"{word}\"");
    Ok(())
}

pub fn remove(store: &JsonFileStore, id: String) -> Result<()> {
    let entry = find_entry(store, &id)?;
    store.delete(&entry.id)?;
    println!("removed \"{}\"", entry.word);
    Ok(())
}

pub async fn lookup(word: String) -> Result<()> {
    let data = DictionaryClient::new().lookup(&word).await?;

    if let Some(ipa) = &data.ipa {
        println!("ipa: {ipa}");
    }
    if let Some(url) = &data.audio_url {
        println!("audio: {url}");
    }
    for meaning in &data.meanings {
        println!("{}:", meaning.part_of_speech);
        for (idx, definition) in meaning.definitions.iter().enumerate() {
            println!("  {}. {}", idx + 1, definition.definition);
            if let Some(example) = &definition.example {
                println!("     e.g. {example}");
            }
            if !definition.synonyms.is_empty() {
                println!("     synonyms: {}", definition.synonyms.join(", "));
            }
            if !definition.antonyms.is_empty() {
                println!("     antonyms: {}", definition.antonyms.join(", "));
            }
        }
    }
    Ok(())
}

pub async fn suggest_words(query: String) -> Result<()> {
    let http = reqwest::Client::new();
    let words = suggest::suggestions(&http, &query).await;
    if words.is_empty() {
        println!("no suggestions");
    } else {
        for word in words {
            println!("{word}");
        }
    }
    Ok(())
}

pub async fn record(
    store: &JsonFileStore,
    settings: &AppSettings,
    id: String,
    device: Option<String>,
) -> Result<()> {
    let mut entry = find_entry(store, &id)?;

    let recorder = Recorder::new();
    // Subscribe before stopping so the terminal event cannot be missed.
    let mut events = recorder.subscribe();
    let preferred = device.or_else(|| settings.preferred_input_device.clone());
    recorder.start_with_device(preferred)?;

    println!("recording \"{}\", press Enter to stop", entry.word);
    wait_for_enter().await?;
    recorder.stop();

    match events.recv().await {
        Ok(RecorderEvent::Finished(clip)) => {
            info!(duration_secs = clip.duration_secs(), "captured recording");
            entry.user_audio = Some(UserAudio::from_clip(&clip));
            store.save(entry)?;
            println!("saved recording ({:.1}s)", clip.duration_secs());
            Ok(())
        }
        Ok(RecorderEvent::Failed { message }) => bail!("recording failed: {message}"),
        Err(_) => bail!("recorder closed before delivering a result"),
    }
}

pub fn devices() -> Result<()> {
    let devices = list_input_devices();
    if devices.is_empty() {
        println!("no input devices found");
        return Ok(());
    }
    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("{}{marker}", device.name);
    }
    Ok(())
}

pub fn export_audio(store: &JsonFileStore, id: String, out: PathBuf) -> Result<()> {
    let entry = find_entry(store, &id)?;
    let Some(user_audio) = &entry.user_audio else {
        bail!("entry \"{}\" has no user recording", entry.word);
    };

    let bytes = AudioClip::decode_data_url(user_audio.as_str())
        .with_context(|| format!("stored recording for \"{}\" is not decodable", entry.word))?;
    std::fs::write(&out, bytes).with_context(|| format!("failed to write {}", out.display()))?;
    println!("wrote {}", out.display());
    Ok(())
}

pub fn config(
    settings_path: &Path,
    settings: &mut AppSettings,
    device: Option<String>,
    default_difficulty: Option<Difficulty>,
) -> Result<()> {
    if device.is_none() && default_difficulty.is_none() {
        let json = serde_json::to_string_pretty(settings).context("serialize settings")?;
        println!("{json}");
        return Ok(());
    }

    if let Some(device) = device {
        settings.preferred_input_device = Some(device);
    }
    if let Some(difficulty) = default_difficulty {
        settings.default_difficulty = difficulty;
    }
    settings.normalize();
    save_settings(settings_path, settings).context("failed to save settings")?;
    println!("settings saved");
    Ok(())
}

/// Resolve a command-line id, accepting the entry id or the exact word.
fn find_entry(store: &JsonFileStore, id: &str) -> Result<Entry> {
    store
        .get_all()
        .into_iter()
        .find(|e| e.id == id || e.word == id)
        .ok_or_else(|| anyhow!("no entry with id or word \"{id}\""))
}

async fn wait_for_enter() -> Result<()> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    })
    .await
    .context("stdin task failed")?
    .context("failed to read stdin")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("entries.json")).unwrap();
        store.save(Entry::new("hello", Difficulty::Easy)).unwrap();
        (dir, store)
    }

    #[test]
    fn find_entry_matches_by_word() {
        let (_dir, store) = seeded_store();
        let entry = find_entry(&store, "hello").unwrap();
        assert_eq!(entry.word, "hello");
    }

    #[test]
    fn find_entry_matches_by_id() {
        let (_dir, store) = seeded_store();
        let id = store.get_all()[0].id.clone();
        assert_eq!(find_entry(&store, &id).unwrap().word, "hello");
    }

    #[test]
    fn find_entry_reports_unknown_ids() {
        let (_dir, store) = seeded_store();
        assert!(find_entry(&store, "missing").is_err());
    }

    #[test]
    fn remove_deletes_by_word() {
        let (_dir, store) = seeded_store();
        remove(&store, "hello".into()).unwrap();
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn export_without_recording_is_an_error() {
        let (dir, store) = seeded_store();
        let out = dir.path().join("out.wav");
        assert!(export_audio(&store, "hello".into(), out).is_err());
    }

    #[test]
    fn export_writes_decoded_wav_bytes() {
        let (dir, store) = seeded_store();
        let clip = AudioClip::from_samples(&[0.25; 160], 16_000).unwrap();
        let mut entry = store.get_all().remove(0);
        entry.user_audio = Some(UserAudio::from_clip(&clip));
        store.save(entry).unwrap();

        let out = dir.path().join("out.wav");
        export_audio(&store, "hello".into(), out.clone()).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), clip.wav_bytes());
    }
}
