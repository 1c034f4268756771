//! Attachment storage backends.
//!
//! Attachments are addressed by opaque keys of the form
//! `<entry-id>/<unique>_<filename>`. The store resolves keys to bytes and
//! nothing else; which entry a key belongs to, and who may see it, is
//! decided above this layer.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Attachment storage backend trait.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Write attachment bytes under the given key.
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Read the bytes stored under a key.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete the bytes stored under a key.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Public URL a client can fetch the attachment from.
    fn public_url(&self, key: &str) -> String;

    /// Backend name for logs ("local", "s3").
    fn backend(&self) -> &'static str;
}

/// Local filesystem storage.
pub struct LocalAttachmentStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalAttachmentStore {
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into(),
        }
    }

    /// Resolve a key to an on-disk path.
    ///
    /// Rejects absolute keys and `..` components to prevent traversal out
    /// of the upload root.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => anyhow::bail!("invalid attachment key: {key}"),
            }
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("failed to create attachment directory")?;
        }

        let mut file = fs::File::create(&path)
            .await
            .context("failed to create attachment file")?;
        file.write_all(data)
            .await
            .context("failed to write attachment")?;
        file.flush().await.context("failed to flush attachment")?;

        debug!(key = %key, size = data.len(), "attachment written");
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        let data = fs::read(&path)
            .await
            .with_context(|| format!("failed to read attachment {key}"))?;
        Ok(data)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;

        if path.exists() {
            fs::remove_file(&path)
                .await
                .context("failed to delete attachment")?;
            debug!(key = %key, "attachment deleted");
        } else {
            warn!(key = %key, "attachment not found for deletion");
        }

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

impl std::fmt::Debug for LocalAttachmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAttachmentStore")
            .field("base_path", &self.base_path)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// S3-compatible object storage.
#[cfg(feature = "s3")]
pub struct S3AttachmentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    /// Optional prefix for all keys.
    prefix: Option<String>,
    /// Base URL for public access (CDN distribution or bucket endpoint).
    base_url: String,
}

#[cfg(feature = "s3")]
impl S3AttachmentStore {
    /// Create a store using the default AWS credential chain.
    pub async fn new(
        bucket: impl Into<String>,
        prefix: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let config = aws_config::load_from_env().await;
        Ok(Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket: bucket.into(),
            prefix,
            base_url: base_url.into(),
        })
    }

    /// Create with a custom endpoint (MinIO and other S3-compatibles).
    pub async fn with_endpoint(
        endpoint_url: &str,
        bucket: impl Into<String>,
        prefix: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let config = aws_config::from_env().endpoint_url(endpoint_url).load().await;
        Ok(Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket: bucket.into(),
            prefix,
            base_url: base_url.into(),
        })
    }

    fn object_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
            None => key.to_string(),
        }
    }
}

#[cfg(feature = "s3")]
#[async_trait]
impl AttachmentStore for S3AttachmentStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .body(aws_sdk_s3::primitives::ByteStream::from(data.to_vec()))
            .send()
            .await
            .context("failed to upload attachment to S3")?;

        debug!(key = %key, size = data.len(), "attachment written to S3");
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
            .with_context(|| format!("failed to get attachment {key} from S3"))?;

        let data = response
            .body
            .collect()
            .await
            .context("failed to read S3 response body")?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
            .context("failed to delete attachment from S3")?;

        debug!(key = %key, "attachment deleted from S3");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!(
                "{}/{}/{}",
                self.base_url.trim_end_matches('/'),
                prefix.trim_end_matches('/'),
                key
            ),
            None => format!("{}/{}", self.base_url.trim_end_matches('/'), key),
        }
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}

#[cfg(feature = "s3")]
impl std::fmt::Debug for S3AttachmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3AttachmentStore")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_traversal() {
        let store = LocalAttachmentStore::new("/tmp/uploads", "/files");
        assert!(store.resolve("abc/photo.jpg").is_ok());
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("abc/../../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
    }

    #[test]
    fn public_url_joins_cleanly() {
        let store = LocalAttachmentStore::new("/tmp/uploads", "https://example.com/files/");
        assert_eq!(
            store.public_url("abc/photo.jpg"),
            "https://example.com/files/abc/photo.jpg"
        );
    }
}
