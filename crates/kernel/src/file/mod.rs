//! Attachment storage.

pub mod service;
pub mod storage;

pub use service::{AttachmentService, MAX_ATTACHMENT_BYTES, sanitize_filename};
pub use storage::{AttachmentStore, LocalAttachmentStore};

#[cfg(feature = "s3")]
pub use storage::S3AttachmentStore;
