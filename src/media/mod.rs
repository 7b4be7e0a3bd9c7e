//! Uploaded media: data-URI decoding and blob persistence.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub mod local;
pub mod memory;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Invalid blob path: {0}")]
    InvalidPath(String),

    #[error("Blob storage error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `path` and return the public URL
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, MediaError>;

    /// Remove a blob; missing blobs are not an error
    async fn delete(&self, path: &str) -> Result<(), MediaError>;

    /// Inverse of the URL returned by `put`, for URLs this store issued
    fn path_from_url(&self, url: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn prefix(&self) -> &'static str {
        match self {
            MediaKind::Image => "data:image",
            MediaKind::Video => "data:video",
        }
    }

    fn default_mime(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/jpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    /// Whether a field value is an inline upload of this kind
    pub fn matches(&self, value: &str) -> bool {
        value.starts_with(self.prefix())
    }
}

/// Decoded `data:<mime>;base64,<payload>` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    pub fn parse(raw: &str) -> Result<Self, MediaError> {
        let rest = raw
            .strip_prefix("data:")
            .ok_or_else(|| MediaError::InvalidDataUri("missing data: scheme".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| MediaError::InvalidDataUri("missing ',' separator".to_string()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| MediaError::InvalidDataUri("only base64 payloads are supported".to_string()))?;
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| MediaError::InvalidDataUri(e.to_string()))?;

        Ok(Self {
            mime: mime.to_string(),
            bytes,
        })
    }

    fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            "video/webm" => "webm",
            "video/quicktime" => "mov",
            m if m.starts_with("video/") => "mp4",
            _ => "jpg",
        }
    }
}

/// Persist `value` if it is an inline upload of `kind`.
///
/// Returns the stored URL, or `None` when the value is not an inline upload.
/// Blob names look like `{folder}/{prefix}{unix_millis}_{label}_{hash}.{ext}`.
pub async fn store_inline(
    blobs: &dyn BlobStore,
    folder: &str,
    prefix: &str,
    label: &str,
    kind: MediaKind,
    value: &str,
) -> Result<Option<String>, MediaError> {
    if !kind.matches(value) {
        return Ok(None);
    }
    let data = DataUri::parse(value)?;
    let digest = hex::encode(Sha256::digest(&data.bytes));
    let path = format!(
        "{}/{}{}_{}_{}.{}",
        folder,
        prefix,
        chrono::Utc::now().timestamp_millis(),
        sanitize_label(label),
        &digest[..12],
        data.extension()
    );
    let content_type = if data.mime.is_empty() { kind.default_mime() } else { data.mime.as_str() };
    let url = blobs.put(&path, data.bytes.clone(), content_type).await?;
    Ok(Some(url))
}

/// Best-effort removal of a blob referenced by a stored URL
pub async fn remove_by_url(blobs: &dyn BlobStore, url: &str) {
    if url.is_empty() {
        return;
    }
    let Some(path) = blobs.path_from_url(url) else {
        tracing::debug!("Not removing foreign media URL {}", url);
        return;
    };
    if let Err(e) = blobs.delete(&path).await {
        tracing::error!("Failed to delete media {}: {}", path, e);
    }
}

fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(40)
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Relative blob paths only: no absolute paths, no `..`, no empty segments
pub(crate) fn validate_path(path: &str) -> Result<(), MediaError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(MediaError::InvalidPath(path.to_string()));
    }
    Ok(())
}
