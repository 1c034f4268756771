//! Database models.

pub mod entry;

pub use entry::{CreateEntry, Entry, Mood, UpdateEntry, Visibility};
