use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{validate_path, BlobStore, MediaError};

/// Blobs kept in memory, keyed by path
pub struct MemoryBlobStore {
    public_base: String,
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new(public_base: impl Into<String>) -> Self {
        Self {
            public_base: public_base.into().trim_end_matches('/').to_string(),
            blobs: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, MediaError> {
        validate_path(path)?;
        self.blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), bytes);
        Ok(format!("{}/{}", self.public_base, path))
    }

    async fn delete(&self, path: &str) -> Result<(), MediaError> {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner()).remove(path);
        Ok(())
    }

    fn path_from_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_base)?.strip_prefix('/')?;
        let path = rest.split('?').next().unwrap_or(rest);
        validate_path(path).ok()?;
        Some(path.to_string())
    }
}
