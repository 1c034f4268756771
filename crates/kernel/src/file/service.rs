//! Attachment service: validation, key generation, and store access.

use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use crate::error::AppError;
use crate::file::storage::AttachmentStore;

/// Maximum accepted attachment size.
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// MIME prefixes and types accepted for upload. Everything the sniffer
/// cannot identify is rejected.
const ALLOWED_MIME: &[&str] = &["image/", "video/", "audio/", "application/pdf"];

/// Service wrapping the configured attachment backend.
pub struct AttachmentService {
    store: Arc<dyn AttachmentStore>,
}

impl AttachmentService {
    pub fn new(store: Arc<dyn AttachmentStore>) -> Self {
        Self { store }
    }

    /// Validate and store an upload for an entry. Returns the new key.
    pub async fn store(
        &self,
        entry_id: Uuid,
        filename: &str,
        data: &[u8],
    ) -> Result<String, AppError> {
        if data.is_empty() {
            return Err(AppError::BadRequest("empty attachment".to_string()));
        }
        if data.len() > MAX_ATTACHMENT_BYTES {
            return Err(AppError::BadRequest(format!(
                "attachment exceeds {MAX_ATTACHMENT_BYTES} bytes"
            )));
        }

        let mime = infer::get(data)
            .map(|kind| kind.mime_type())
            .ok_or_else(|| AppError::BadRequest("unrecognized attachment type".to_string()))?;
        if !ALLOWED_MIME
            .iter()
            .any(|allowed| mime.starts_with(allowed))
        {
            return Err(AppError::BadRequest(format!(
                "attachment type not allowed: {mime}"
            )));
        }

        let unique = Uuid::now_v7().simple().to_string();
        let key = format!(
            "{entry_id}/{}_{}",
            &unique[..8],
            sanitize_filename(filename)
        );

        self.store.put(&key, data).await?;
        Ok(key)
    }

    /// Read attachment bytes.
    pub async fn fetch(&self, key: &str) -> Result<Vec<u8>, AppError> {
        Ok(self.store.fetch(key).await?)
    }

    /// Delete one attachment. Errors bubble; callers that clean up in bulk
    /// decide whether to tolerate them.
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key).await
    }

    /// Public URL for a stored key.
    pub fn public_url(&self, key: &str) -> String {
        self.store.public_url(key)
    }

    /// Backend name for logs.
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Sniff a content type for serving; unknown bytes are served opaque.
    pub fn content_type(data: &[u8]) -> &'static str {
        infer::get(data)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream")
    }
}

impl std::fmt::Debug for AttachmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentService")
            .field("backend", &self.backend())
            .finish()
    }
}

/// Strip any path components and replace characters outside
/// `[A-Za-z0-9._-]` so a client-supplied name cannot escape the key space.
pub fn sanitize_filename(name: &str) -> String {
    let base = std::path::Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_simple_names() {
        assert_eq!(sanitize_filename("photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("my file.jpg"), "my_file.jpg");
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("/var/log/app.log"), "app.log");
    }

    #[test]
    fn sanitize_replaces_hostile_characters() {
        let out = sanitize_filename("shell.php\0.jpg");
        assert!(!out.contains('\0'));

        let out = sanitize_filename("..\\..\\windows\\system32");
        assert!(!out.contains('\\'));

        assert_eq!(sanitize_filename("test<script>.jpg"), "test_script_.jpg");
    }

    #[tokio::test]
    async fn store_rejects_empty_and_unknown_payloads() {
        let service = AttachmentService::new(Arc::new(
            crate::file::storage::LocalAttachmentStore::new("/tmp/quaderno-test", "/files"),
        ));
        let entry = Uuid::now_v7();

        let empty = service.store(entry, "a.bin", &[]).await;
        assert!(matches!(empty, Err(AppError::BadRequest(_))));

        // Plain text is not a recognizable media type.
        let text = service.store(entry, "a.txt", b"hello world").await;
        assert!(matches!(text, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn store_accepts_png_bytes() {
        let dir = std::env::temp_dir().join("quaderno-attach-test");
        let service = AttachmentService::new(Arc::new(
            crate::file::storage::LocalAttachmentStore::new(&dir, "/files"),
        ));
        let entry = Uuid::now_v7();

        // Minimal PNG magic followed by padding; enough for type sniffing.
        let mut png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&[0u8; 64]);

        let key = service.store(entry, "pic.png", &png).await.unwrap();
        assert!(key.starts_with(&format!("{entry}/")));
        assert!(key.ends_with("_pic.png"));

        let fetched = service.fetch(&key).await.unwrap();
        assert_eq!(fetched, png);

        service.remove(&key).await.unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }
}
