//! # phonolog-core
//!
//! Reusable engine for the Phonolog pronunciation journal.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → Recorder → SPSC RingBuffer → collector (spawn_blocking)
//!                                                │
//!                                     AudioClip (in-memory 16-bit WAV)
//!                                                │
//!                                     UserAudio data URL → EntryStore
//! ```
//!
//! The audio callback only downmixes and pushes into the ring; encoding and
//! persistence happen on the collector and caller threads. A recording that
//! reaches [`AudioClip`] is self-contained and stays playable across
//! persistence round-trips with no live device handle behind it.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod cleanup;
pub mod dictionary;
pub mod entry;
pub mod error;
pub mod storage;
pub mod suggest;

// Convenience re-exports for downstream crates
pub use audio::encode::AudioClip;
pub use audio::{Recorder, RecorderEvent, RecorderStatus};
pub use cleanup::clean_stale_audio_refs;
pub use dictionary::{DictionaryClient, Pronunciation};
pub use entry::{Definition, Difficulty, Entry, Meaning, UserAudio};
pub use error::PhonologError;
pub use storage::{EntryStore, JsonFileStore};
