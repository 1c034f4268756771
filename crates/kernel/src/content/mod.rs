//! Entry services.

pub mod entry_service;

pub use entry_service::{EntryPage, EntryService, shape_page};
