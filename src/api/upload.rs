//! Multipart upload parsing

use axum::extract::Multipart;

use crate::error::AppError;
use crate::storage::MediaUpload;

pub const MAX_IMAGE_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_VIDEO_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Kind of media a form field must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn field_name(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    fn mime_prefix(self) -> &'static str {
        match self {
            MediaKind::Image => "image/",
            MediaKind::Video => "video/",
        }
    }

    fn max_bytes(self) -> usize {
        match self {
            MediaKind::Image => MAX_IMAGE_UPLOAD_BYTES,
            MediaKind::Video => MAX_VIDEO_UPLOAD_BYTES,
        }
    }
}

/// Parsed upload form
#[derive(Debug)]
pub struct UploadForm {
    pub media: MediaUpload,
    pub caption: String,
}

/// Read the media field (`image` or `video`) and an optional `caption`
///
/// # Errors
/// `Validation` when the file is missing, of the wrong type, or too large
pub async fn read_upload(mut multipart: Multipart, kind: MediaKind) -> Result<UploadForm, AppError> {
    let mut media: Option<MediaUpload> = None;
    let mut caption = String::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Failed to parse multipart: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name == kind.field_name() {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .ok_or_else(|| AppError::validation("Missing content type for uploaded file"))?;
            if !content_type.starts_with(kind.mime_prefix()) {
                return Err(AppError::validation(format!(
                    "Unsupported media type: expected {}*",
                    kind.mime_prefix()
                )));
            }

            let max_size = kind.max_bytes();
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| AppError::validation(format!("Failed to read file: {}", e)))?
            {
                if bytes.len() + chunk.len() > max_size {
                    return Err(AppError::validation(format!(
                        "File too large: exceeds {} bytes",
                        max_size
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            media = Some(MediaUpload {
                bytes,
                content_type,
            });
        } else if field_name == "caption" {
            caption = field
                .text()
                .await
                .map_err(|e| AppError::validation(format!("Failed to read caption: {}", e)))?;
        }
    }

    let media = media
        .filter(|upload| !upload.bytes.is_empty())
        .ok_or_else(|| AppError::validation("No file uploaded"))?;
    Ok(UploadForm { media, caption })
}
