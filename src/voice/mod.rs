//! Voice pipeline: silence-gated capture, transcription, synthesis, playback

pub mod capture;
pub mod playback;
pub mod stt;
pub mod tts;

pub use capture::{
    chunk_peak, max_frames, pcm_to_wav, AudioRecorder, GateConfig, Recording, SilenceGate,
};
pub use playback::AudioPlayback;
pub use stt::Transcriber;
pub use tts::{build_ssml, SpeechSynthesizer};
