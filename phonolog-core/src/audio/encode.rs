//! In-memory WAV encoding of captured samples.
//!
//! A finished recording must stay playable after the process that captured
//! it is gone, so the persistable form embeds the encoded bytes directly as
//! a base64 `data:` URL rather than referencing any live device state.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::{PhonologError, Result};

/// MIME type of the produced encoding.
pub const WAV_MIME: &str = "audio/wav";

const DATA_URL_PREFIX: &str = "data:audio/wav;base64,";

/// A finished recording: 16-bit mono PCM WAV held wholly in memory.
#[derive(Debug, Clone)]
pub struct AudioClip {
    bytes: Vec<u8>,
    sample_rate: u32,
    sample_count: usize,
}

impl AudioClip {
    /// Encode mono f32 samples in [-1.0, 1.0] as a 16-bit PCM WAV.
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer =
            WavWriter::new(&mut cursor, spec).map_err(|e| PhonologError::Encode(e.to_string()))?;
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer
                .write_sample((clamped * i16::MAX as f32) as i16)
                .map_err(|e| PhonologError::Encode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| PhonologError::Encode(e.to_string()))?;

        Ok(Self {
            bytes: cursor.into_inner(),
            sample_rate,
            sample_count: samples.len(),
        })
    }

    /// Complete WAV file bytes (header included).
    pub fn wav_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.sample_count as f64 / self.sample_rate as f64
    }

    /// Base64 data URL embedding the WAV bytes, safe to store and reload.
    pub fn to_data_url(&self) -> String {
        format!("{DATA_URL_PREFIX}{}", BASE64.encode(&self.bytes))
    }

    /// Decode a stored data URL back into WAV file bytes.
    pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
        let encoded = url
            .strip_prefix(DATA_URL_PREFIX)
            .or_else(|| url.split_once(";base64,").map(|(_, rest)| rest))
            .ok_or_else(|| PhonologError::Encode("not a base64 audio data URL".into()))?;
        BASE64
            .decode(encoded)
            .map_err(|e| PhonologError::Encode(e.to_string()))
    }
}
