//! DALL-E image generation

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;

use crate::config::ImageConfig;
use crate::imagegen::ImageCreator;
use crate::{Error, Result};

/// DALL-E model generation
#[derive(Debug, Clone, Copy)]
pub enum DallEModel {
    /// dall-e-2
    DallE2,
    /// dall-e-3 (supports the quality knob)
    DallE3,
}

impl DallEModel {
    const fn api_name(self) -> &'static str {
        match self {
            Self::DallE2 => "dall-e-2",
            Self::DallE3 => "dall-e-3",
        }
    }
}

#[derive(Deserialize)]
struct GenerationResponse {
    data: Vec<GenerationImage>,
}

#[derive(Deserialize)]
struct GenerationImage {
    b64_json: String,
}

/// Generates images with the OpenAI image API
pub struct DallECreator {
    client: reqwest::Client,
    api_key: String,
    model: DallEModel,
    config: ImageConfig,
}

impl DallECreator {
    /// Create a new DALL-E creator
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, model: DallEModel, config: ImageConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for DALL-E".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            config,
        })
    }
}

#[async_trait]
impl ImageCreator for DallECreator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let size = format!("{}x{}", self.config.width, self.config.height);

        let mut body = serde_json::json!({
            "model": self.model.api_name(),
            "prompt": prompt,
            "size": size,
            "response_format": "b64_json",
            "user": "reverie",
        });
        if matches!(self.model, DallEModel::DallE3) {
            body["quality"] = serde_json::Value::String(self.config.quality.clone());
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/images/generations")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "DALL-E API error");
            // The image API signals safety rejections as 400s with a coded body
            if status == reqwest::StatusCode::BAD_REQUEST
                && body.contains("content_policy_violation")
            {
                return Err(Error::ContentFilter);
            }
            return Err(Error::Image(format!("DALL-E error {status}: {body}")));
        }

        let result: GenerationResponse = response.json().await?;
        let image = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::Image("no image in DALL-E response".to_string()))?;

        base64::engine::general_purpose::STANDARD
            .decode(image.b64_json)
            .map_err(|e| Error::Image(format!("invalid base64 image: {e}")))
    }

    fn name(&self) -> &'static str {
        match self.model {
            DallEModel::DallE2 => "dall-e-2",
            DallEModel::DallE3 => "dall-e-3",
        }
    }
}
