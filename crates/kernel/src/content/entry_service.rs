//! Entry service: access-checked CRUD and the listing path.
//!
//! Every operation is request-scoped and stateless; the only thing that
//! survives a listing call is the continuation cursor handed back to the
//! client. The service performs no retries; store failures surface to the
//! caller as-is.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::file::AttachmentService;
use crate::middleware::AuthUser;
use crate::models::{CreateEntry, Entry, UpdateEntry};
use crate::query::{EntryQueryBuilder, ListParams, PageCursor};

/// Service for entry operations.
#[derive(Clone)]
pub struct EntryService {
    inner: Arc<EntryServiceInner>,
}

struct EntryServiceInner {
    pool: PgPool,
    attachments: Arc<AttachmentService>,
}

/// One page of listing results plus the resume point, if any.
#[derive(Debug)]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub next: Option<PageCursor>,
}

impl EntryService {
    pub fn new(pool: PgPool, attachments: Arc<AttachmentService>) -> Self {
        Self {
            inner: Arc::new(EntryServiceInner { pool, attachments }),
        }
    }

    /// Create a new entry owned by the caller.
    pub async fn create(&self, caller: &AuthUser, input: CreateEntry) -> AppResult<Entry> {
        let entry = Entry::create(&self.inner.pool, &caller.sub, input).await?;
        info!(entry_id = %entry.id, owner = %entry.owner_id, "entry created");
        Ok(entry)
    }

    /// Load a single entry, enforcing the visibility rules.
    ///
    /// A caller who may not see an existing entry gets a clean denial, not
    /// a 404; existence of an id is not treated as a secret here.
    pub async fn load_for_view(&self, id: Uuid, caller: &AuthUser) -> AppResult<Entry> {
        let entry = Entry::find_by_id(&self.inner.pool, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !entry.can_view(caller) {
            return Err(AppError::Forbidden);
        }

        Ok(entry)
    }

    /// Update an entry. Owner only.
    pub async fn update(
        &self,
        id: Uuid,
        caller: &AuthUser,
        input: UpdateEntry,
    ) -> AppResult<Entry> {
        let existing = Entry::find_by_id(&self.inner.pool, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !existing.is_owner(caller) {
            return Err(AppError::Forbidden);
        }

        let entry = Entry::update(&self.inner.pool, id, input)
            .await?
            .ok_or(AppError::NotFound)?;

        info!(entry_id = %id, "entry updated");
        Ok(entry)
    }

    /// Delete an entry and its attachments. Owner only.
    pub async fn delete(&self, id: Uuid, caller: &AuthUser) -> AppResult<()> {
        let entry = Entry::find_by_id(&self.inner.pool, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !entry.is_owner(caller) {
            return Err(AppError::Forbidden);
        }

        if !Entry::delete(&self.inner.pool, id).await? {
            return Err(AppError::NotFound);
        }

        // Blob cleanup is best-effort once the row is gone; an orphaned
        // blob is recoverable, a dangling row reference is not.
        for key in &entry.attachments {
            if let Err(e) = self.inner.attachments.remove(key).await {
                warn!(key = %key, error = %e, "failed to delete attachment blob");
            }
        }

        info!(entry_id = %id, "entry deleted");
        Ok(())
    }

    /// List entries for the caller: one permission-scoped query, newest
    /// first, at most `page_size` rows plus a cursor when more exist.
    pub async fn list(&self, caller: &AuthUser, params: &ListParams) -> AppResult<EntryPage> {
        let sql = EntryQueryBuilder::new(&caller.sub, params).build();
        let rows = sqlx::query_as::<_, Entry>(&sql)
            .fetch_all(&self.inner.pool)
            .await?;

        Ok(shape_page(rows, params.page_size))
    }

    /// Store an upload and attach its key to the entry. Owner only.
    pub async fn attach(
        &self,
        id: Uuid,
        caller: &AuthUser,
        filename: &str,
        data: &[u8],
    ) -> AppResult<(Entry, String)> {
        let entry = Entry::find_by_id(&self.inner.pool, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !entry.is_owner(caller) {
            return Err(AppError::Forbidden);
        }

        let key = self.inner.attachments.store(id, filename, data).await?;

        let entry = Entry::add_attachment(&self.inner.pool, id, &key)
            .await?
            .ok_or(AppError::NotFound)?;

        info!(entry_id = %id, key = %key, "attachment added");
        Ok((entry, key))
    }

    /// Remove one attachment from an entry and the blob store. Owner only.
    pub async fn detach(&self, id: Uuid, caller: &AuthUser, key: &str) -> AppResult<Entry> {
        let entry = Entry::find_by_id(&self.inner.pool, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !entry.is_owner(caller) {
            return Err(AppError::Forbidden);
        }

        if !entry.attachments.iter().any(|k| k == key) {
            return Err(AppError::NotFound);
        }

        if let Err(e) = self.inner.attachments.remove(key).await {
            warn!(key = %key, error = %e, "failed to delete attachment blob");
        }

        let entry = Entry::remove_attachment(&self.inner.pool, id, key)
            .await?
            .ok_or(AppError::NotFound)?;

        info!(entry_id = %id, key = %key, "attachment removed");
        Ok(entry)
    }
}

/// Shape a raw result set into a client page.
///
/// The query fetched one row beyond `page_size`; that extra row only
/// signals that more data exists, it is never returned. The cursor names
/// the last row the client actually received.
pub fn shape_page(mut rows: Vec<Entry>, page_size: u32) -> EntryPage {
    let page_size = page_size as usize;
    let has_more = rows.len() > page_size;

    if has_more {
        rows.truncate(page_size);
    }

    let next = if has_more {
        rows.last().map(|e| PageCursor::new(e.created_at, e.id))
    } else {
        None
    };

    EntryPage {
        entries: rows,
        next,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::Visibility;
    use chrono::{DateTime, Utc};

    fn entry_at(ts: &str) -> Entry {
        let created: DateTime<Utc> = ts.parse().unwrap();
        Entry {
            id: Uuid::now_v7(),
            owner_id: "u1".to_string(),
            created_at: created,
            updated_at: created,
            title: String::new(),
            body: String::new(),
            tags: vec![],
            mood: None,
            visibility: Visibility::Private,
            viewers: vec![],
            attachments: vec![],
        }
    }

    #[test]
    fn short_page_has_no_cursor() {
        let rows = vec![entry_at("2024-02-01T00:00:00Z")];
        let page = shape_page(rows, 10);
        assert_eq!(page.entries.len(), 1);
        assert!(page.next.is_none());
    }

    #[test]
    fn exactly_full_page_has_no_cursor() {
        let rows = vec![
            entry_at("2024-02-01T00:00:00Z"),
            entry_at("2024-01-01T00:00:00Z"),
        ];
        let page = shape_page(rows, 2);
        assert_eq!(page.entries.len(), 2);
        assert!(page.next.is_none());
    }

    #[test]
    fn overfull_page_truncates_and_points_at_last_returned_row() {
        let rows = vec![
            entry_at("2024-03-01T00:00:00Z"),
            entry_at("2024-02-01T00:00:00Z"),
            entry_at("2024-01-01T00:00:00Z"),
        ];
        let last_returned = (rows[1].created_at, rows[1].id);

        let page = shape_page(rows, 2);
        assert_eq!(page.entries.len(), 2);

        let cursor = page.next.unwrap();
        assert_eq!((cursor.created_at, cursor.id), last_returned);
    }

    #[test]
    fn two_entry_scenario_pages_of_one() {
        // Owner u1: entries at 2024-01-01 and 2024-02-01. Page size 1
        // returns the newer entry first with a token, then the older one
        // with none. Rows arrive newest-first from the store.
        let newer = entry_at("2024-02-01T00:00:00Z");
        let older = entry_at("2024-01-01T00:00:00Z");

        let first = shape_page(vec![newer.clone(), older.clone()], 1);
        assert_eq!(first.entries.len(), 1);
        assert_eq!(first.entries[0].id, newer.id);
        let cursor = first.next.unwrap();
        assert_eq!(cursor.created_at, newer.created_at);

        // Second page: the store returns only the older row.
        let second = shape_page(vec![older.clone()], 1);
        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].id, older.id);
        assert!(second.next.is_none());

        // Pages are disjoint.
        assert_ne!(first.entries[0].id, second.entries[0].id);
    }
}
