//! Stability AI image generation (SDXL and the Stable Image endpoints)

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;

use crate::config::ImageConfig;
use crate::imagegen::ImageCreator;
use crate::{Error, Result};

const SDXL_ENGINE: &str = "stable-diffusion-xl-1024-v1-0";

#[derive(Deserialize)]
struct SdxlResponse {
    artifacts: Vec<SdxlArtifact>,
}

#[derive(Deserialize)]
struct SdxlArtifact {
    base64: String,
    #[serde(rename = "finishReason", default)]
    finish_reason: String,
}

/// Generates images with the SDXL v1 text-to-image endpoint
pub struct SdxlCreator {
    client: reqwest::Client,
    api_key: String,
    config: ImageConfig,
}

impl SdxlCreator {
    /// Create a new SDXL creator
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, config: ImageConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "Stability AI API key required for SDXL".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            config,
        })
    }
}

#[async_trait]
impl ImageCreator for SdxlCreator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let url =
            format!("https://api.stability.ai/v1/generation/{SDXL_ENGINE}/text-to-image");

        let body = serde_json::json!({
            "text_prompts": [{ "text": prompt }],
            "width": self.config.width,
            "height": self.config.height,
            "steps": self.config.steps,
            "cfg_scale": self.config.cfg_scale,
            "samples": 1,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "SDXL API error");
            return Err(Error::Image(format!("SDXL error {status}: {body}")));
        }

        let result: SdxlResponse = response.json().await?;
        let artifact = result
            .artifacts
            .into_iter()
            .next()
            .ok_or_else(|| Error::Image("no image artifact returned".to_string()))?;

        if artifact.finish_reason == "CONTENT_FILTERED" {
            return Err(Error::ContentFilter);
        }

        base64::engine::general_purpose::STANDARD
            .decode(artifact.base64)
            .map_err(|e| Error::Image(format!("invalid base64 image: {e}")))
    }

    fn name(&self) -> &'static str {
        "sdxl"
    }
}

/// Generates images with the v2beta Stable Image endpoints ("core", "ultra",
/// "sd3"), which return raw image bytes instead of JSON artifacts
pub struct StableImageCreator {
    client: reqwest::Client,
    api_key: String,
    config: ImageConfig,
}

impl StableImageCreator {
    /// Create a new Stable Image creator
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, config: ImageConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "Stability AI API key required for Stable Image".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            config,
        })
    }
}

#[async_trait]
impl ImageCreator for StableImageCreator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let url = format!(
            "https://api.stability.ai/v2beta/stable-image/generate/{}",
            self.config.stable_image_model
        );

        let mut form = reqwest::multipart::Form::new()
            .text("prompt", prompt.to_string())
            .text("output_format", "png");

        if self.config.stable_image_model == "core" {
            if let Some(preset) = &self.config.core_preset {
                form = form.text("preset", preset.clone());
            }
        }
        if let Some(sd3_model) = &self.config.sd3_model {
            form = form.text("model", sd3_model.clone());
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "image/*")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::ContentFilter);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Stable Image API error");
            return Err(Error::Image(format!("Stable Image error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn name(&self) -> &'static str {
        "stable-image"
    }
}
