//! Prompt moderation via the OpenAI moderations endpoint
//!
//! Every image prompt passes through here before any generation call; a
//! flagged prompt aborts the creation instead of being sent on.

use serde::Deserialize;

use crate::{Error, Result};

#[derive(Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: serde_json::Value,
}

/// Checks prompts against the moderation API
pub struct Moderator {
    client: reqwest::Client,
    api_key: String,
}

impl Moderator {
    /// Create a new moderator
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for moderation".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
        })
    }

    /// Check a prompt; `true` means it may be used
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails
    pub async fn check(&self, prompt: &str) -> Result<bool> {
        let response = self
            .client
            .post("https://api.openai.com/v1/moderations")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({ "input": prompt }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "moderation API error");
            return Err(Error::Moderation(format!(
                "moderation error {status}: {body}"
            )));
        }

        let result: ModerationResponse = response.json().await?;
        let Some(first) = result.results.first() else {
            return Err(Error::Moderation("empty moderation result".to_string()));
        };

        if first.flagged {
            tracing::warn!(categories = %first.categories, "prompt flagged by moderation");
        }

        Ok(!first.flagged)
    }
}
