//! Blob storage seam for listing images.
//!
//! Handlers only see the [`ImageStore`] trait; the provider behind it is a
//! black box. The default implementation writes to local disk and hands back
//! `/uploads/...` URLs served by `ServeDir`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::body::Bytes;
use uuid::Uuid;

use crate::errors::AppError;

pub const PUBLIC_PREFIX: &str = "/uploads";

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the bytes under `key` and return the public URL.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, AppError>;

    /// Delete the object behind a previously returned URL. Unknown URLs are
    /// not an error.
    async fn delete(&self, url: &str) -> Result<(), AppError>;
}

/// Build an object key for an upload: scoped by property, uniquified so
/// re-uploads of the same filename never collide.
pub fn object_key(property_id: i64, filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    format!("{}/{}_{}", property_id, Uuid::new_v4(), safe)
}

pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_env() -> Self {
        let root = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let key = url.strip_prefix(PUBLIC_PREFIX)?.trim_start_matches('/');
        // refuse path traversal in stored URLs
        if key.split('/').any(|part| part == "..") {
            return None;
        }
        Some(self.root.join(key))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<String, AppError> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| AppError::internal(format!("failed to create upload dir: {err}")))?;
        }

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|err| AppError::internal(format!("failed to write upload: {err}")))?;

        Ok(format!("{}/{}", PUBLIC_PREFIX, key))
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        let Some(path) = self.path_for_url(url) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::internal(format!("failed to delete upload: {err}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_are_scoped_and_sanitized() {
        let key = object_key(12, "foto da sala.jpg");
        assert!(key.starts_with("12/"));
        assert!(key.ends_with("foto_da_sala.jpg"));
        assert!(!key.contains(' '));
    }

    #[test]
    fn url_outside_public_prefix_maps_to_nothing() {
        let store = LocalImageStore::new("/tmp/does-not-matter");
        assert!(store.path_for_url("https://cdn.example.com/x.jpg").is_none());
        assert!(store.path_for_url("/uploads/../etc/passwd").is_none());
    }

    #[tokio::test]
    async fn put_then_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());

        let url = store
            .put("3/abc_foto.jpg", Bytes::from_static(b"jpegdata"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "/uploads/3/abc_foto.jpg");
        assert!(dir.path().join("3/abc_foto.jpg").exists());

        store.delete(&url).await.unwrap();
        assert!(!dir.path().join("3/abc_foto.jpg").exists());

        // deleting again is fine
        store.delete(&url).await.unwrap();
    }
}
