//! Media storage module
//!
//! Handles:
//! - Media upload to Cloudflare R2 (public bucket)
//! - In-memory media backend for tests and local runs

mod media;
mod memory;

use std::time::Instant;

use async_trait::async_trait;

pub use media::R2MediaStorage;
pub use memory::MemoryMediaStore;

use crate::data::EntityId;
use crate::error::AppError;

/// Uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Blob storage returning public URLs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `upload` under `folder` and return its public URL
    async fn upload(&self, folder: &str, upload: MediaUpload) -> Result<String, AppError>;
}

/// File extension for a MIME type
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        _ => "bin",
    }
}

/// Object key for a new upload: `{folder}/{ulid}.{ext}`
pub fn object_key(folder: &str, content_type: &str) -> String {
    format!(
        "{}/{}.{}",
        folder,
        EntityId::new().0,
        extension_for(content_type)
    )
}

/// Record upload metrics around a backend call.
pub(crate) async fn instrumented<F>(folder: &str, size: usize, upload: F) -> Result<String, AppError>
where
    F: std::future::Future<Output = Result<String, AppError>>,
{
    use crate::metrics::{MEDIA_BYTES_UPLOADED, MEDIA_UPLOADS_TOTAL};

    let started = Instant::now();
    let url = upload.await?;
    MEDIA_UPLOADS_TOTAL.with_label_values(&[folder]).inc();
    MEDIA_BYTES_UPLOADED.inc_by(size as u64);
    tracing::debug!(
        folder,
        size,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Media uploaded"
    );
    Ok(url)
}

pub(crate) fn build_r2_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_only()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_uses_folder_and_extension() {
        let key = object_key("posts", "image/png");
        assert!(key.starts_with("posts/"));
        assert!(key.ends_with(".png"));
        // posts/ + 26-char ULID + .png
        assert_eq!(key.len(), "posts/".len() + 26 + ".png".len());

        assert!(object_key("videos", "application/octet-stream").ends_with(".bin"));
    }
}
