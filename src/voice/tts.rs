//! Text-to-speech via the Azure Cognitive Services REST API
//!
//! Synthesized phrases are cached on disk keyed by a hash of the voice
//! settings and text, so the fixed status lines are only billed once.

use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Output format requested from Azure; matches the playback path
const OUTPUT_FORMAT: &str = "riff-16khz-16bit-mono-pcm";

/// Synthesizes spoken phrases as WAV bytes
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    subscription_key: String,
    region: String,
    voice: VoiceConfig,
}

impl SpeechSynthesizer {
    /// Create a new synthesizer and ensure the cache directory exists
    ///
    /// # Errors
    ///
    /// Returns error if credentials are empty or the cache directory cannot
    /// be created
    pub fn new(subscription_key: String, region: String, voice: VoiceConfig) -> Result<Self> {
        if subscription_key.is_empty() || region.is_empty() {
            return Err(Error::Config(
                "Azure Speech key and region required for TTS".to_string(),
            ));
        }

        std::fs::create_dir_all(&voice.cache_dir)?;

        Ok(Self {
            client: reqwest::Client::new(),
            subscription_key,
            region,
            voice,
        })
    }

    /// Synthesize a phrase, consulting the disk cache first
    ///
    /// One-off text (a daydreamed prompt spoken aloud) should pass
    /// `use_cache = false` to keep the cache bounded to the fixed lines.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or cache IO fails
    pub async fn synthesize(&self, text: &str, use_cache: bool) -> Result<Vec<u8>> {
        if !use_cache {
            return self.request_synthesis(text).await;
        }

        let path = self.cache_path(text);
        if path.exists() {
            tracing::debug!(path = %path.display(), "speech cache hit");
            return Ok(std::fs::read(&path)?);
        }

        let audio = self.request_synthesis(text).await?;
        std::fs::write(&path, &audio)?;
        Ok(audio)
    }

    /// Cache file for a phrase under the current voice settings
    fn cache_path(&self, text: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(self.voice.language.as_bytes());
        hasher.update(self.voice.gender.as_bytes());
        hasher.update(self.voice.voice.as_bytes());
        hasher.update(text.as_bytes());
        let digest = hex::encode(hasher.finalize());

        self.voice.cache_dir.join(format!("{digest}.wav"))
    }

    /// Call the Azure synthesis endpoint
    async fn request_synthesis(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            self.region
        );
        let ssml = build_ssml(&self.voice, text);

        tracing::debug!(chars = text.len(), "requesting speech synthesis");

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header("User-Agent", "reverie")
            .body(ssml)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TTS API error");
            return Err(Error::Tts(format!("synthesis error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Build the SSML document for a phrase
///
/// The express-as and prosody layers are only emitted when configured, so
/// the default output is the minimal speak/voice pair.
#[must_use]
pub fn build_ssml(voice: &VoiceConfig, text: &str) -> String {
    let mut inner = xml_escape(text);

    let mut prosody_attrs = String::new();
    if let Some(pitch) = &voice.pitch {
        prosody_attrs.push_str(&format!(" pitch=\"{}\"", xml_escape(pitch)));
    }
    if let Some(rate) = &voice.rate {
        prosody_attrs.push_str(&format!(" rate=\"{}\"", xml_escape(rate)));
    }
    if !prosody_attrs.is_empty() {
        inner = format!("<prosody{prosody_attrs}>{inner}</prosody>");
    }

    if let Some(style) = &voice.style {
        inner = format!(
            "<mstts:express-as style=\"{}\">{inner}</mstts:express-as>",
            xml_escape(style)
        );
    }

    format!(
        "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" \
         xmlns:mstts=\"https://www.w3.org/2001/mstts\" xml:lang=\"{}\">\
         <voice name=\"{}\">{inner}</voice></speak>",
        xml_escape(&voice.language),
        xml_escape(&voice.voice),
    )
}

/// Escape text for inclusion in SSML content or attribute values
fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
