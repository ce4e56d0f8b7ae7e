//! Microphone recording capture.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It **must not** block on a mutex, perform I/O, or allocate beyond its
//! reusable downmix scratch buffer. The callback therefore only converts
//! incoming frames to mono f32 and pushes them into an SPSC ring buffer
//! whose `push_slice` is lock-free.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS), so the stream is created and dropped on the collector thread,
//! which runs inside `spawn_blocking`. A sync oneshot handshake propagates
//! device-open success or failure back to the `start()` caller.
//!
//! Echo cancellation, noise suppression and gain control are owned by the OS
//! capture stack; cpal exposes no per-stream toggles for them.

pub mod device;
pub mod encode;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
};

#[cfg(feature = "audio-cpal")]
use crate::buffering::{create_audio_ring, AudioProducer, Consumer, Producer};
use crate::error::{PhonologError, Result};
use self::encode::AudioClip;

/// Broadcast channel capacity. One recording produces one terminal event.
const EVENT_CAP: usize = 16;

/// Samples drained from the ring per collector iteration.
#[cfg(feature = "audio-cpal")]
const DRAIN_CHUNK: usize = 4096;

/// Collector sleep when the ring is empty (avoids busy-wait burning a core).
#[cfg(feature = "audio-cpal")]
const SLEEP_EMPTY_MS: u64 = 5;

/// Current state of the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderStatus {
    /// No active capture. May hold a finished result and/or an error.
    Idle,
    /// Microphone open, samples being buffered.
    Recording,
}

/// Terminal event of one recording, delivered on the broadcast channel.
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// Capture finished and encoded; the clip is also readable via `result()`.
    Finished(AudioClip),
    /// Capture ended without a usable result.
    Failed { message: String },
}

/// Drives the record / stop / reset lifecycle and hands back a
/// self-contained [`AudioClip`].
///
/// `Recorder` is `Send + Sync`; all fields use interior mutability. The
/// finished clip arrives asynchronously: observe it via [`Recorder::subscribe`]
/// or poll [`Recorder::result`].
pub struct Recorder {
    /// `true` while capture is active. Cleared by `stop()` or a stream error.
    running: Arc<AtomicBool>,
    status: Arc<Mutex<RecorderStatus>>,
    result: Arc<Mutex<Option<AudioClip>>>,
    last_error: Arc<Mutex<Option<String>>>,
    event_tx: broadcast::Sender<RecorderEvent>,
}

impl Recorder {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAP);
        Self {
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(RecorderStatus::Idle)),
            result: Arc::new(Mutex::new(None)),
            last_error: Arc::new(Mutex::new(None)),
            event_tx,
        }
    }

    /// Start capturing from the default input device.
    pub fn start(&self) -> Result<()> {
        self.start_with_device(None)
    }

    /// Start capturing, preferring the named input device when given.
    ///
    /// Returns once device access is settled: `Ok` in Recording state, or an
    /// error (also recorded on the state) without ever entering Recording.
    /// Each acquisition failure maps to a distinct user-facing message:
    /// capture support compiled out, access denied, no device present, or
    /// the backend's own message passed through.
    ///
    /// # Errors
    /// `PhonologError::AlreadyRecording` if a capture is active.
    #[cfg(feature = "audio-cpal")]
    pub fn start_with_device(&self, preferred_device_name: Option<String>) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(PhonologError::AlreadyRecording);
        }

        *self.last_error.lock() = None;
        self.running.store(true, Ordering::SeqCst);

        let (producer, mut consumer) = create_audio_ring();
        let stream_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        // Sync oneshot: the collector thread signals open success/failure.
        let (open_tx, open_rx) = crossbeam_channel::bounded::<Result<u32>>(1);

        let running = Arc::clone(&self.running);
        let status = Arc::clone(&self.status);
        let result = Arc::clone(&self.result);
        let last_error = Arc::clone(&self.last_error);
        let event_tx = self.event_tx.clone();
        let stream_error_for_task = Arc::clone(&stream_error);

        tokio::task::spawn_blocking(move || {
            // Open the device on THIS thread; cpal::Stream is !Send.
            let capture = match AudioCapture::open(
                producer,
                Arc::clone(&running),
                Arc::clone(&stream_error_for_task),
                preferred_device_name.as_deref(),
            ) {
                Ok(capture) => {
                    let _ = open_tx.send(Ok(capture.sample_rate));
                    capture
                }
                Err(e) => {
                    let _ = open_tx.send(Err(e));
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            };

            let sample_rate = capture.sample_rate;
            let mut scratch = vec![0f32; DRAIN_CHUNK];
            let mut samples: Vec<f32> = Vec::new();

            while running.load(Ordering::Relaxed) {
                let n = consumer.pop_slice(&mut scratch);
                if n == 0 {
                    std::thread::sleep(std::time::Duration::from_millis(SLEEP_EMPTY_MS));
                    continue;
                }
                samples.extend_from_slice(&scratch[..n]);
            }

            // The callback no-ops once `running` is false; pick up the tail.
            loop {
                let n = consumer.pop_slice(&mut scratch);
                if n == 0 {
                    break;
                }
                samples.extend_from_slice(&scratch[..n]);
            }

            // Releases the device on this thread, whatever happens next.
            drop(capture);
            *status.lock() = RecorderStatus::Idle;

            if let Some(message) = stream_error_for_task.lock().take() {
                *last_error.lock() = Some(message.clone());
                let _ = event_tx.send(RecorderEvent::Failed { message });
                return;
            }

            match AudioClip::from_samples(&samples, sample_rate) {
                Ok(clip) => {
                    info!(
                        samples = samples.len(),
                        sample_rate,
                        duration_secs = clip.duration_secs(),
                        "recording finished"
                    );
                    *result.lock() = Some(clip.clone());
                    let _ = event_tx.send(RecorderEvent::Finished(clip));
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!("failed to encode recording: {message}");
                    *last_error.lock() = Some(message.clone());
                    let _ = event_tx.send(RecorderEvent::Failed { message });
                }
            }
        });

        match open_rx.recv() {
            Ok(Ok(_sample_rate)) => {
                *self.status.lock() = RecorderStatus::Recording;
                info!("recording started");
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                *self.status.lock() = RecorderStatus::Idle;
                *self.last_error.lock() = Some(e.to_string());
                Err(e)
            }
            Err(_) => {
                // Channel closed before a message was sent.
                self.running.store(false, Ordering::SeqCst);
                *self.status.lock() = RecorderStatus::Idle;
                let message = "capture task died before the device opened".to_string();
                *self.last_error.lock() = Some(message.clone());
                Err(PhonologError::AudioStream(message))
            }
        }
    }

    /// Stub when the `audio-cpal` feature is disabled.
    #[cfg(not(feature = "audio-cpal"))]
    pub fn start_with_device(&self, _preferred_device_name: Option<String>) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(PhonologError::AlreadyRecording);
        }
        let err = PhonologError::CaptureUnsupported;
        *self.last_error.lock() = Some(err.to_string());
        Err(err)
    }

    /// Finalize the active capture. No-op unless currently Recording.
    ///
    /// The encoded result arrives asynchronously as
    /// [`RecorderEvent::Finished`] once the collector has drained and encoded
    /// the buffered audio.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        *self.status.lock() = RecorderStatus::Idle;
        info!("recording stop requested");
    }

    /// Clear any finished result and error. The device was already released
    /// when the result was produced.
    pub fn reset(&self) {
        *self.result.lock() = None;
        *self.last_error.lock() = None;
    }

    /// Current lifecycle state (snapshot).
    pub fn status(&self) -> RecorderStatus {
        *self.status.lock()
    }

    /// The most recent finished clip, if any.
    pub fn result(&self) -> Option<AudioClip> {
        self.result.lock().clone()
    }

    /// The most recent capture error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Subscribe to terminal recording events.
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a backend error message onto the closest user-facing failure.
///
/// cpal reports permission problems as backend-specific strings, so this is
/// a best-effort match on the message text.
fn map_acquire_error(message: String) -> PhonologError {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("permission")
        || lowered.contains("access denied")
        || lowered.contains("not allowed")
    {
        PhonologError::MicAccessDenied
    } else if lowered.contains("no device") || lowered.contains("device not available") {
        PhonologError::NoInputDevice
    } else {
        PhonologError::AudioDevice(message)
    }
}

/// Handle to an active capture stream.
///
/// **Not `Send`**: must be created and dropped on the same OS thread.
#[cfg(feature = "audio-cpal")]
struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    _stream: Stream,
    /// Actual capture sample rate reported by the device (Hz).
    sample_rate: u32,
}

#[cfg(feature = "audio-cpal")]
impl AudioCapture {
    /// Open an input device by preferred name, otherwise fall back to the
    /// default input device and then the first available device.
    fn open(
        producer: AudioProducer,
        running: Arc<AtomicBool>,
        stream_error: Arc<Mutex<Option<String>>>,
        preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();

        let mut selected_device = None;
        if let Some(preferred) = preferred_device_name {
            match host.input_devices() {
                Ok(mut devices) => {
                    selected_device = devices
                        .find(|d| d.name().map(|n| n == preferred).unwrap_or(false));
                    if selected_device.is_none() {
                        tracing::warn!("preferred input device '{preferred}' not found, falling back");
                    }
                }
                Err(e) => {
                    tracing::warn!("failed to list input devices while resolving preference: {e}");
                }
            }
        }

        let device = match selected_device.or_else(|| host.default_input_device()) {
            Some(device) => device,
            None => {
                let mut devices = host
                    .input_devices()
                    .map_err(|_| PhonologError::NoInputDevice)?;
                devices.next().ok_or(PhonologError::NoInputDevice)?
            }
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| map_acquire_error(e.to_string()))?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        info!(sample_rate, channels, "capture config selected");

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        // First supported format wins, in preference order.
        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                build_input_stream_typed::<f32>(&device, &config, producer, running, stream_error)
            }
            SampleFormat::I16 => {
                build_input_stream_typed::<i16>(&device, &config, producer, running, stream_error)
            }
            SampleFormat::U8 => {
                build_input_stream_typed::<u8>(&device, &config, producer, running, stream_error)
            }
            fmt => {
                return Err(PhonologError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| map_acquire_error(e.to_string()))?;

        stream
            .play()
            .map_err(|e| PhonologError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
        })
    }
}

/// Build an input stream that downmixes to mono f32 and pushes into the ring.
///
/// A stream error recorded by the error callback also clears `running`, so
/// the collector unwinds instead of waiting on a dead device.
#[cfg(feature = "audio-cpal")]
fn build_input_stream_typed<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: AudioProducer,
    running: Arc<AtomicBool>,
    stream_error: Arc<Mutex<Option<String>>>,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let mut mix_buf: Vec<f32> = Vec::new();
    let err_running = Arc::clone(&running);

    device.build_input_stream(
        config,
        move |data: &[T], _info: &cpal::InputCallbackInfo| {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            let frames = data.len() / channels;
            mix_buf.resize(frames, 0.0);
            for frame in 0..frames {
                let base = frame * channels;
                let mut sum = 0f32;
                for ch in 0..channels {
                    sum += f32::from_sample(data[base + ch]);
                }
                mix_buf[frame] = sum / channels as f32;
            }
            let written = producer.push_slice(&mix_buf);
            if written < mix_buf.len() {
                tracing::warn!("ring buffer full: dropped {} frames", mix_buf.len() - written);
            }
        },
        move |err| {
            tracing::error!("audio stream error: {err}");
            *stream_error.lock() = Some(err.to_string());
            err_running.store(false, Ordering::Release);
        },
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_when_idle_is_a_noop() {
        let recorder = Recorder::new();
        recorder.stop();
        assert_eq!(recorder.status(), RecorderStatus::Idle);
        assert!(recorder.result().is_none());
        assert!(recorder.last_error().is_none());
    }

    #[test]
    fn reset_clears_result_and_error() {
        let recorder = Recorder::new();
        let clip = AudioClip::from_samples(&[0.0; 160], 16_000).unwrap();
        *recorder.result.lock() = Some(clip);
        *recorder.last_error.lock() = Some("boom".into());

        recorder.reset();
        assert!(recorder.result().is_none());
        assert!(recorder.last_error().is_none());
        assert_eq!(recorder.status(), RecorderStatus::Idle);
    }

    #[test]
    fn starting_while_recording_is_rejected() {
        let recorder = Recorder::new();
        recorder.running.store(true, Ordering::SeqCst);
        assert!(matches!(
            recorder.start_with_device(None),
            Err(PhonologError::AlreadyRecording)
        ));
    }

    #[test]
    fn acquire_errors_map_to_distinct_messages() {
        assert!(matches!(
            map_acquire_error("Operation not allowed by OS policy".into()),
            PhonologError::MicAccessDenied
        ));
        assert!(matches!(
            map_acquire_error("ALSA: Permission denied".into()),
            PhonologError::MicAccessDenied
        ));
        assert!(matches!(
            map_acquire_error("the requested device is no device".into()),
            PhonologError::NoInputDevice
        ));
        // Anything else passes the backend message through.
        match map_acquire_error("backend exploded".into()) {
            PhonologError::AudioDevice(message) => assert_eq!(message, "backend exploded"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
