//! Speech-to-text via the OpenAI transcription API

use crate::voice::capture::pcm_to_wav;
use crate::{Error, Result};

/// Response from the transcription endpoint
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcribes recorded speech to text
pub struct Transcriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
    sample_rate: u32,
}

impl Transcriber {
    /// Create a new transcriber
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, model: String, sample_rate: u32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for transcription".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            sample_rate,
        })
    }

    /// Transcribe raw capture PCM to text
    ///
    /// The PCM is wrapped in a WAV container before upload; the capture side
    /// produces headerless bytes.
    ///
    /// # Errors
    ///
    /// Returns error if encoding or the API call fails
    pub async fn transcribe(&self, pcm: &[u8]) -> Result<String> {
        let wav = pcm_to_wav(pcm, self.sample_rate)?;
        tracing::debug!(audio_bytes = wav.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("transcription error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await?;
        tracing::info!(transcript = %result.text, "transcription complete");

        Ok(result.text)
    }
}
