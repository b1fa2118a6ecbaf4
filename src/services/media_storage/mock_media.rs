use std::sync::Mutex;

use async_trait::async_trait;

use super::{MediaError, MediaStorage};

#[allow(dead_code)]
#[derive(Default)]
pub struct MockMediaStorage {
    pub uploads: Mutex<Vec<String>>,
    pub url: Option<String>,
    pub should_fail: bool,
}

#[allow(dead_code)]
impl MockMediaStorage {
    pub fn returning(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl MediaStorage for MockMediaStorage {
    async fn upload_image(&self, data_uri: &str) -> Result<Option<String>, MediaError> {
        if self.should_fail {
            return Err(MediaError::Transport("mock upload failure".into()));
        }
        self.uploads.lock().unwrap().push(data_uri.to_string());
        Ok(self.url.clone())
    }
}
