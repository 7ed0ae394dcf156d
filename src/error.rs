//! Error types for the reverie kiosk

use thiserror::Error;

/// Result type alias for reverie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the reverie kiosk
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or stream error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Chat completion error
    #[error("chat error: {0}")]
    Chat(String),

    /// Content moderation error
    #[error("moderation error: {0}")]
    Moderation(String),

    /// Image generation error
    #[error("image generation error: {0}")]
    Image(String),

    /// The image provider's content filter rejected the prompt
    #[error("content filter triggered")]
    ContentFilter,

    /// Blob storage error
    #[error("storage error: {0}")]
    Storage(String),

    /// Canvas composition error
    #[error("canvas error: {0}")]
    Canvas(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// WAV encoding/decoding error
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    /// Image decoding error
    #[error("image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),
}
