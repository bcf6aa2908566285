//! Media attachment storage
//!
//! Uploaded files land on local disk under `<root>/media/` and are served
//! back at `/media/<name>`. A transient write failure is retried with a
//! short backoff; exhausting the retries surfaces UpstreamUnavailable,
//! which callers report as 503.

use pollwatch_common::models::{MediaRef, MediaType};
use pollwatch_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Maximum accepted upload size per file (50 MB)
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Write attempts before giving up
const STORE_ATTEMPTS: u32 = 3;

/// Backoff before the second attempt; doubles per attempt
const STORE_BACKOFF_MS: u64 = 100;

/// Only images and videos are accepted
pub fn is_supported_content_type(content_type: &str) -> bool {
    content_type.starts_with("image/") || content_type.starts_with("video/")
}

/// Local-disk media store
#[derive(Debug, Clone)]
pub struct MediaStore {
    media_dir: PathBuf,
}

impl MediaStore {
    pub fn new(media_dir: PathBuf) -> Self {
        Self { media_dir }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Create the media directory if missing. Idempotent.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.media_dir)?;
        Ok(())
    }

    /// Store one uploaded file and return its public reference.
    ///
    /// The stored name is a fresh UUID plus a sanitized extension, so
    /// uploads can never collide or traverse out of the media directory.
    pub async fn store(
        &self,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<MediaRef> {
        let extension = file_extension(file_name, content_type);
        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.media_dir.join(&stored_name);

        let mut backoff = Duration::from_millis(STORE_BACKOFF_MS);
        let mut last_error = None;

        for attempt in 1..=STORE_ATTEMPTS {
            match tokio::fs::write(&path, data).await {
                Ok(()) => {
                    debug!(
                        file = %stored_name,
                        bytes = data.len(),
                        "Stored media file"
                    );
                    return Ok(MediaRef {
                        url: format!("/media/{}", stored_name),
                        media_type: MediaType::from_content_type(content_type),
                    });
                }
                Err(e) => {
                    warn!(
                        file = %stored_name,
                        attempt,
                        "Media write failed: {}", e
                    );
                    last_error = Some(e);
                    if attempt < STORE_ATTEMPTS {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(Error::UpstreamUnavailable(format!(
            "Media storage failed after {} attempts: {}",
            STORE_ATTEMPTS,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

/// Pick a safe file extension: the upload's own extension when it is short
/// alphanumeric, otherwise the content-type subtype, otherwise "bin".
fn file_extension(file_name: &str, content_type: &str) -> String {
    if let Some(ext) = Path::new(file_name).extension().and_then(|e| e.to_str()) {
        if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ext.to_ascii_lowercase();
        }
    }

    content_type
        .split('/')
        .nth(1)
        .map(|subtype| subtype.split('+').next().unwrap_or(subtype))
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_supported_content_types() {
        assert!(is_supported_content_type("image/jpeg"));
        assert!(is_supported_content_type("image/png"));
        assert!(is_supported_content_type("video/mp4"));
        assert!(!is_supported_content_type("application/pdf"));
        assert!(!is_supported_content_type("text/html"));
        assert!(!is_supported_content_type(""));
    }

    #[test]
    fn test_file_extension_from_name() {
        assert_eq!(file_extension("photo.JPG", "image/jpeg"), "jpg");
        assert_eq!(file_extension("clip.mp4", "video/mp4"), "mp4");
    }

    #[test]
    fn test_file_extension_falls_back_to_content_type() {
        assert_eq!(file_extension("no-extension", "image/png"), "png");
        assert_eq!(file_extension("weird.../...", "image/svg+xml"), "svg");
        assert_eq!(file_extension("x", "junk"), "bin");
    }

    #[tokio::test]
    async fn test_store_writes_file_and_returns_ref() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf());
        store.ensure_directory_exists().unwrap();

        let media = store
            .store("evidence.jpg", "image/jpeg", b"fake image bytes")
            .await
            .unwrap();

        assert!(media.url.starts_with("/media/"));
        assert!(media.url.ends_with(".jpg"));
        assert_eq!(media.media_type, MediaType::Image);

        let stored_name = media.url.strip_prefix("/media/").unwrap();
        let on_disk = std::fs::read(dir.path().join(stored_name)).unwrap();
        assert_eq!(on_disk, b"fake image bytes");
    }

    #[tokio::test]
    async fn test_store_tags_video_by_content_type() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf());
        store.ensure_directory_exists().unwrap();

        let media = store
            .store("clip.mp4", "video/mp4", b"fake video bytes")
            .await
            .unwrap();
        assert_eq!(media.media_type, MediaType::Video);
    }

    #[tokio::test]
    async fn test_store_generates_unique_names() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf());
        store.ensure_directory_exists().unwrap();

        let a = store.store("same.jpg", "image/jpeg", b"one").await.unwrap();
        let b = store.store("same.jpg", "image/jpeg", b"two").await.unwrap();
        assert_ne!(a.url, b.url);
    }

    #[tokio::test]
    async fn test_store_unwritable_dir_is_upstream_unavailable() {
        // Directory never created, so every write attempt fails
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path().join("missing").join("deeper"));

        let result = store.store("a.jpg", "image/jpeg", b"bytes").await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    }
}
