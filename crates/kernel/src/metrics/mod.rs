//! Prometheus metrics collection.

use anyhow::Result;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

/// HTTP request labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub path: String,
    pub status: u16,
}

/// Application metrics.
pub struct Metrics {
    registry: Registry,

    /// HTTP request counter by method/route/status.
    pub http_requests: Family<HttpLabels, Counter>,

    /// Entries created.
    pub entries_created: Counter,

    /// Entries deleted.
    pub entries_deleted: Counter,

    /// Listing pages served.
    pub pages_served: Counter,

    /// Attachment uploads.
    pub attachment_uploads: Counter,

    /// Attachment upload bytes.
    pub attachment_upload_bytes: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests = Family::<HttpLabels, Counter>::default();
        registry.register(
            "http_requests",
            "HTTP requests by method, route, and status",
            http_requests.clone(),
        );

        let entries_created = Counter::default();
        registry.register("entries_created", "Entries created", entries_created.clone());

        let entries_deleted = Counter::default();
        registry.register("entries_deleted", "Entries deleted", entries_deleted.clone());

        let pages_served = Counter::default();
        registry.register(
            "listing_pages_served",
            "Listing pages served",
            pages_served.clone(),
        );

        let attachment_uploads = Counter::default();
        registry.register(
            "attachment_uploads",
            "Attachment uploads",
            attachment_uploads.clone(),
        );

        let attachment_upload_bytes = Counter::default();
        registry.register(
            "attachment_upload_bytes",
            "Total attachment bytes uploaded",
            attachment_upload_bytes.clone(),
        );

        Self {
            registry,
            http_requests,
            entries_created,
            entries_deleted,
            pages_served,
            attachment_uploads,
            attachment_upload_bytes,
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
