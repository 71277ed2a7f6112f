//! In-memory media store
//!
//! Keeps uploaded bytes in a map; URLs point at the configured public base.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MediaStore, MediaUpload, instrumented, object_key};
use crate::error::AppError;

pub struct MemoryMediaStore {
    public_url: String,
    objects: RwLock<HashMap<String, MediaUpload>>,
}

impl MemoryMediaStore {
    pub fn new(public_url: &str) -> Self {
        Self {
            public_url: public_url.trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Stored object for a URL previously returned by `upload`
    pub async fn get(&self, url: &str) -> Option<MediaUpload> {
        let key = url.strip_prefix(&self.public_url)?.trim_start_matches('/');
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, folder: &str, upload: MediaUpload) -> Result<String, AppError> {
        let key = object_key(folder, &upload.content_type);
        let size = upload.bytes.len();
        let url = format!("{}/{}", self.public_url, key);

        instrumented(folder, size, async {
            self.objects.write().await.insert(key, upload);
            Ok(url)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_returns_public_url() {
        let store = MemoryMediaStore::new("https://media.example.com/");
        let url = store
            .upload(
                "stories",
                MediaUpload {
                    bytes: vec![1, 2, 3],
                    content_type: "image/jpeg".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(url.starts_with("https://media.example.com/stories/"));
        assert!(url.ends_with(".jpg"));
        assert_eq!(store.get(&url).await.unwrap().bytes, vec![1, 2, 3]);
        assert_eq!(store.len().await, 1);
    }
}
