//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::content::EntryService;
use crate::db;
use crate::file::{AttachmentService, AttachmentStore, LocalAttachmentStore};
use crate::metrics::Metrics;
use crate::middleware::TokenVerifier;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Bearer token verifier.
    auth: TokenVerifier,

    /// Entry service.
    entries: EntryService,

    /// Attachment service.
    attachments: Arc<AttachmentService>,

    /// Prometheus metrics.
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Initialize all services from configuration. Called once at startup.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config).await?;
        db::migrate(&pool).await?;

        let store = build_attachment_store(config).await?;
        let attachments = Arc::new(AttachmentService::new(store));
        info!(backend = attachments.backend(), "attachment storage ready");

        let entries = EntryService::new(pool.clone(), attachments.clone());
        let auth = TokenVerifier::new(&config.jwt_secret);
        let metrics = Arc::new(Metrics::new());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db: pool,
                auth,
                entries,
                attachments,
                metrics,
            }),
        })
    }

    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub fn auth(&self) -> &TokenVerifier {
        &self.inner.auth
    }

    pub fn entries(&self) -> &EntryService {
        &self.inner.entries
    }

    pub fn attachments(&self) -> &AttachmentService {
        &self.inner.attachments
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }
}

/// Pick the attachment backend from configuration.
async fn build_attachment_store(config: &Config) -> Result<Arc<dyn AttachmentStore>> {
    #[cfg(feature = "s3")]
    if let Some(bucket) = &config.s3_bucket {
        let store = match &config.s3_endpoint {
            Some(endpoint) => {
                crate::file::S3AttachmentStore::with_endpoint(
                    endpoint,
                    bucket,
                    config.s3_prefix.clone(),
                    config.files_url.clone(),
                )
                .await?
            }
            None => {
                crate::file::S3AttachmentStore::new(
                    bucket,
                    config.s3_prefix.clone(),
                    config.files_url.clone(),
                )
                .await?
            }
        };
        return Ok(Arc::new(store));
    }

    #[cfg(not(feature = "s3"))]
    if config.s3_bucket.is_some() {
        tracing::warn!("S3_BUCKET is set but the s3 feature is not compiled in; using local storage");
    }

    Ok(Arc::new(LocalAttachmentStore::new(
        config.uploads_dir.clone(),
        config.files_url.clone(),
    )))
}
