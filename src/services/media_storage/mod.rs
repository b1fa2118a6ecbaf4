pub mod cloudinary;
pub mod mock_media;

use async_trait::async_trait;

pub use cloudinary::CloudinaryMediaStorage;
pub use mock_media::MockMediaStorage;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("upload rejected: {0}")]
    Upload(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for MediaError {
    fn from(err: reqwest::Error) -> Self {
        MediaError::Transport(err.to_string())
    }
}

/// Hosted media CDN boundary. Issue photos arrive as `data:` URIs and leave
/// as CDN URLs; everything else about image handling lives upstream.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Uploads a data-URI image and returns its public URL. `Ok(None)` means
    /// the CDN is not configured; callers store an empty photo reference
    /// instead of failing the request.
    async fn upload_image(&self, data_uri: &str) -> Result<Option<String>, MediaError>;
}
