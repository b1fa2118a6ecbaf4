use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::MediaSettings;

use super::{MediaError, MediaStorage};

const UPLOAD_FOLDER: &str = "samasya/issues";

pub struct CloudinaryMediaStorage {
    pub client: Client,
    pub settings: Option<MediaSettings>,
}

impl CloudinaryMediaStorage {
    pub fn new(client: Client, settings: Option<MediaSettings>) -> Self {
        Self { client, settings }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[async_trait]
impl MediaStorage for CloudinaryMediaStorage {
    async fn upload_image(&self, data_uri: &str) -> Result<Option<String>, MediaError> {
        let Some(settings) = &self.settings else {
            // CDN not configured: the caller stores an empty photo reference.
            return Ok(None);
        };

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| MediaError::Upload(e.to_string()))?
            .as_secs();

        // Signed upload: SHA-256 over the sorted parameter string + secret.
        let to_sign = format!(
            "folder={}&timestamp={}{}",
            UPLOAD_FOLDER, timestamp, settings.api_secret
        );
        let signature = hex::encode(Sha256::digest(to_sign.as_bytes()));

        let url = format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            settings.cloud_name
        );

        let form = [
            ("file", data_uri.to_string()),
            ("api_key", settings.api_key.clone()),
            ("timestamp", timestamp.to_string()),
            ("folder", UPLOAD_FOLDER.to_string()),
            ("signature", signature),
            ("signature_algorithm", "sha256".to_string()),
        ];

        let response = self.client.post(&url).form(&form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Upload(format!("{status}: {body}")));
        }

        let parsed: UploadResponse = response.json().await?;
        Ok(Some(parsed.secure_url))
    }
}
