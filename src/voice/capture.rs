//! Silence-gated audio capture from the microphone
//!
//! The gate logic ([`SilenceGate`]) is a pure state machine fed fixed-size
//! chunks of `i16` samples, so every termination and trimming rule is
//! testable without audio hardware. [`AudioRecorder`] drives it from a live
//! cpal input stream.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::config::AudioConfig;
use crate::{Error, Result};

/// Silence-gate tuning, decoupled from the device settings
#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// Samples per chunk
    pub chunk_size: usize,

    /// Peak-amplitude cutoff below which a chunk is silent
    pub silence_threshold: u16,

    /// Minimum chunks for the session to count as real speech
    pub min_frames: usize,

    /// Consecutive silent chunks that confirm end of speech
    pub max_silent_frames: usize,
}

impl From<&AudioConfig> for GateConfig {
    fn from(audio: &AudioConfig) -> Self {
        Self {
            chunk_size: audio.chunk_size,
            silence_threshold: audio.silence_threshold,
            min_frames: audio.min_frames,
            max_silent_frames: audio.max_silent_frames,
        }
    }
}

/// One finished capture session
#[derive(Debug, Clone)]
pub struct Recording {
    /// Raw PCM bytes (signed 16-bit little-endian, no container), with the
    /// trailing silent chunks trimmed off
    pub pcm: Vec<u8>,

    /// Whether enough chunks were read for this to be real speech
    pub valid: bool,

    /// Total chunks read, before trimming
    pub chunks_read: usize,
}

/// Chunks that fit in `max_duration` seconds at the given rate
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn max_frames(max_duration_secs: f64, sample_rate: u32, chunk_size: usize) -> usize {
    (max_duration_secs * f64::from(sample_rate) / chunk_size as f64).floor() as usize
}

/// Peak absolute amplitude of a chunk
#[must_use]
pub fn chunk_peak(chunk: &[i16]) -> u16 {
    chunk.iter().map(|&s| s.unsigned_abs()).max().unwrap_or(0)
}

/// Classifies chunks as silent or speech and decides when a recording ends
///
/// A silent chunk extends the current run only if the previous chunk exists;
/// it starts a new run (count 1) right after speech, and continues one after
/// another silent chunk. The session's very first chunk has no previous
/// chunk and is never counted into a run — a boundary case kept as observed,
/// pinned by tests rather than "fixed".
#[derive(Debug)]
pub struct SilenceGate {
    config: GateConfig,
    samples: Vec<i16>,
    chunks_read: usize,
    silent_run: usize,
    prev_silent: Option<bool>,
    silence_confirmed: bool,
}

impl SilenceGate {
    /// Create a gate for one capture session
    #[must_use]
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            samples: Vec::new(),
            chunks_read: 0,
            silent_run: 0,
            prev_silent: None,
            silence_confirmed: false,
        }
    }

    /// Feed one chunk; returns `true` once silence is confirmed
    ///
    /// Chunks are accumulated regardless of classification; trimming happens
    /// in [`SilenceGate::finish`].
    pub fn push(&mut self, chunk: &[i16]) -> bool {
        let silent = chunk_peak(chunk) < self.config.silence_threshold;

        if silent {
            match self.prev_silent {
                Some(true) => self.silent_run += 1,
                Some(false) => self.silent_run = 1,
                None => {}
            }
        } else {
            self.silent_run = 0;
        }

        self.prev_silent = Some(silent);
        self.samples.extend_from_slice(chunk);
        self.chunks_read += 1;

        if self.silent_run > self.config.max_silent_frames {
            self.silence_confirmed = true;
        }

        self.silence_confirmed
    }

    /// Total chunks fed so far
    #[must_use]
    pub const fn chunks_read(&self) -> usize {
        self.chunks_read
    }

    /// Whether a terminating silence run has been observed
    #[must_use]
    pub const fn silence_confirmed(&self) -> bool {
        self.silence_confirmed
    }

    /// Close the session: trim the trailing silent chunks and judge validity
    ///
    /// The trailing `max_silent_frames` chunks are always excluded, even when
    /// the session ended at the duration cap — the trim may then cut into
    /// speech, which is accepted behavior. A session shorter than the trim
    /// length returns an empty buffer; its validity flag is still computed
    /// from the untrimmed chunk count.
    #[must_use]
    pub fn finish(self) -> Recording {
        let valid = self.chunks_read >= self.config.min_frames;

        let kept_chunks = self.chunks_read.saturating_sub(self.config.max_silent_frames);
        let kept_samples = kept_chunks * self.config.chunk_size;

        let pcm = self.samples[..kept_samples.min(self.samples.len())]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        Recording {
            pcm,
            valid,
            chunks_read: self.chunks_read,
        }
    }
}

/// Records from the default input device through a [`SilenceGate`]
pub struct AudioRecorder {
    device: Device,
    config: StreamConfig,
    audio: AudioConfig,
    buffer: Arc<Mutex<Vec<i16>>>,
}

impl AudioRecorder {
    /// Open the default input device at the configured rate, mono
    ///
    /// # Errors
    ///
    /// Returns error if no input device or no matching stream config exists
    pub fn new(audio: AudioConfig) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(audio.sample_rate)
                    && c.max_sample_rate() >= SampleRate(audio.sample_rate)
            })
            .ok_or_else(|| Error::Audio("no suitable input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(audio.sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = audio.sample_rate,
            channels = config.channels,
            "audio recorder initialized"
        );

        Ok(Self {
            device,
            config,
            audio,
            buffer: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Record until the duration cap or a confirmed silence run
    ///
    /// Blocks the calling thread for the whole session; the input stream is
    /// owned by this call and closed on every exit path. There is no
    /// cancellation. A session that never contains speech is returned with
    /// `valid = false`, not as an error.
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be opened or started
    pub fn record(&self) -> Result<Recording> {
        let cap = max_frames(
            self.audio.max_recording_secs,
            self.audio.sample_rate,
            self.audio.chunk_size,
        );
        let chunk_size = self.audio.chunk_size;
        let mut gate = SilenceGate::new(GateConfig::from(&self.audio));

        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }

        let buffer = Arc::clone(&self.buffer);
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        #[allow(clippy::cast_possible_truncation)]
                        buf.extend(
                            data.iter()
                                .map(|s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16),
                        );
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        tracing::debug!(max_frames = cap, "recording");

        'session: while gate.chunks_read() < cap && !gate.silence_confirmed() {
            let mut pending = Vec::new();
            if let Ok(mut buf) = self.buffer.lock() {
                while buf.len() >= chunk_size {
                    pending.push(buf.drain(..chunk_size).collect::<Vec<i16>>());
                }
            }

            for chunk in &pending {
                if gate.push(chunk) || gate.chunks_read() >= cap {
                    break 'session;
                }
            }

            std::thread::sleep(Duration::from_millis(10));
        }

        drop(stream);

        let recording = gate.finish();
        tracing::debug!(
            chunks = recording.chunks_read,
            bytes = recording.pcm.len(),
            valid = recording.valid,
            "recording finished"
        );

        Ok(recording)
    }
}

/// Wrap raw 16-bit mono PCM bytes in a WAV container for the STT API
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for pair in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
