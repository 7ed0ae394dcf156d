//! Azure Blob Storage upload over REST
//!
//! Authenticated with a container SAS token so no signing machinery is
//! needed on the kiosk; the container itself is public-read so the share
//! links work without credentials.

use crate::config::StorageConfig;
use crate::{Error, Result};

/// Uploads creation artifacts to a blob container
pub struct Storage {
    client: reqwest::Client,
    account: String,
    container: String,
    sas_token: String,
}

impl Storage {
    /// Create a new storage client
    ///
    /// # Errors
    ///
    /// Returns error if the account name or SAS token is empty
    pub fn new(config: &StorageConfig, sas_token: String) -> Result<Self> {
        if config.account.is_empty() {
            return Err(Error::Config("storage.account is not set".to_string()));
        }
        if sas_token.is_empty() {
            return Err(Error::Config("AZURE_STORAGE_SAS is not set".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            account: config.account.clone(),
            container: config.container.clone(),
            sas_token: sas_token.trim_start_matches('?').to_string(),
        })
    }

    /// Public URL of a blob, without credentials
    #[must_use]
    pub fn blob_url(&self, blob_name: &str) -> String {
        blob_url(&self.account, &self.container, blob_name)
    }

    /// Upload a blob, overwriting any existing one
    ///
    /// # Errors
    ///
    /// Returns error if the PUT fails
    pub async fn upload(&self, blob_name: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        let url = format!("{}?{}", self.blob_url(blob_name), self.sas_token);
        let bytes = data.len();

        let response = self
            .client
            .put(&url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!("upload error {status}: {body}")));
        }

        tracing::debug!(blob = blob_name, bytes, "blob uploaded");
        Ok(())
    }
}

/// Public URL of a blob in an account/container
#[must_use]
pub fn blob_url(account: &str, container: &str, blob_name: &str) -> String {
    format!("https://{account}.blob.core.windows.net/{container}/{blob_name}")
}

/// Fill the HTML share-page template for one creation
///
/// The template carries `***IMG-URL***`, `***PROMPT***`, `***GEN-BY***`,
/// and `***TIME***` placeholders.
#[must_use]
pub fn render_share_page(
    template: &str,
    image_url: &str,
    prompt: &str,
    generated_by: &str,
    time: &str,
) -> String {
    template
        .replace("***IMG-URL***", image_url)
        .replace("***PROMPT***", prompt)
        .replace("***GEN-BY***", generated_by)
        .replace("***TIME***", time)
}
