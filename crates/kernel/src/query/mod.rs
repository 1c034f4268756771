//! Listing query construction and pagination.
//!
//! The one computationally interesting path in the service: translate a
//! caller's filter parameters plus an opaque continuation token into a
//! single permission-scoped query, and the result page back into a client
//! page with a next-token.

pub mod builder;
pub mod cursor;
pub mod params;

pub use builder::{BaseRetrieval, EntryQueryBuilder};
pub use cursor::{CursorError, PageCursor};
pub use params::{
    DEFAULT_PAGE_SIZE, ListParams, MAX_PAGE_SIZE, Predicate, RawListParams, VisibilityScope,
};
