//! Image generation providers
//!
//! A provider trait with one implementation per upstream API; the active
//! creator is chosen from configuration at startup.

mod openai;
mod stability;

pub use openai::{DallECreator, DallEModel};
pub use stability::{SdxlCreator, StableImageCreator};

use async_trait::async_trait;

use crate::config::{ApiKeys, ImageConfig};
use crate::{Error, Result};

/// Trait for image generation backends
#[async_trait]
pub trait ImageCreator: Send + Sync {
    /// Generate one image for a prompt, returned as encoded PNG bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContentFilter`] when the provider's own filter
    /// rejects the prompt, and other errors for API failures
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Build the configured image creator
///
/// # Errors
///
/// Returns error if the required API key is missing or the model name is
/// unknown
pub fn from_config(image: &ImageConfig, keys: &ApiKeys) -> Result<Box<dyn ImageCreator>> {
    let creator: Box<dyn ImageCreator> = match image.model.as_str() {
        "dalle2" => Box::new(DallECreator::new(
            keys.require_openai()?.to_string(),
            DallEModel::DallE2,
            image.clone(),
        )?),
        "dalle3" => Box::new(DallECreator::new(
            keys.require_openai()?.to_string(),
            DallEModel::DallE3,
            image.clone(),
        )?),
        "sdxl" => Box::new(SdxlCreator::new(require_stability(keys)?, image.clone())?),
        "stable-image" => Box::new(StableImageCreator::new(
            require_stability(keys)?,
            image.clone(),
        )?),
        other => return Err(Error::Config(format!("unknown image model \"{other}\""))),
    };

    tracing::debug!(provider = creator.name(), "image creator initialized");
    Ok(creator)
}

fn require_stability(keys: &ApiKeys) -> Result<String> {
    keys.stability
        .clone()
        .ok_or_else(|| Error::Config("SAI_API_KEY is not set".to_string()))
}
