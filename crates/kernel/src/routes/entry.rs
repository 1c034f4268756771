//! Entry CRUD and listing route handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::content::EntryPage;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{CreateEntry, Entry, UpdateEntry};
use crate::query::RawListParams;
use crate::state::AppState;

/// Create the entry router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/entries", get(list_entries).post(create_entry))
        .route(
            "/api/entries/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .route("/api/entries/{id}/attachments", post(upload_attachment))
        .route(
            "/api/entries/{id}/attachments/{file}",
            axum::routing::delete(delete_attachment),
        )
}

/// Paginated listing response.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<Entry>,
    pub count: usize,
    #[serde(rename = "nextToken", skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl From<EntryPage> for ListResponse {
    fn from(page: EntryPage) -> Self {
        Self {
            count: page.entries.len(),
            next_token: page.next.map(|cursor| cursor.encode()),
            items: page.entries,
        }
    }
}

/// Response for a stored attachment.
#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub key: String,
    pub url: String,
    pub entry: Entry,
}

/// List entries with filtering and pagination.
///
/// GET /api/entries?scope=all&tag=travel&mood=happy&from=2024-01-01&to=2024-02-01&q=rome&page_size=10&token=...
async fn list_entries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(raw): Query<RawListParams>,
) -> AppResult<Json<ListResponse>> {
    let params = raw.validate()?;
    let page = state.entries().list(&user, &params).await?;

    state.metrics().pages_served.inc();
    Ok(Json(page.into()))
}

/// Create a new entry.
async fn create_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateEntry>,
) -> AppResult<(StatusCode, Json<Entry>)> {
    let entry = state.entries().create(&user, input).await?;

    state.metrics().entries_created.inc();
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Get a single entry, enforcing visibility.
async fn get_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Entry>> {
    let entry = state.entries().load_for_view(id, &user).await?;
    Ok(Json(entry))
}

/// Update an entry. Owner only.
async fn update_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateEntry>,
) -> AppResult<Json<Entry>> {
    let entry = state.entries().update(id, &user, input).await?;
    Ok(Json(entry))
}

/// Delete an entry and its attachments. Owner only.
async fn delete_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state.entries().delete(id, &user).await?;

    state.metrics().entries_deleted.inc();
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Upload an attachment for an entry. Owner only.
///
/// Takes the first file field of the multipart body.
async fn upload_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<AttachmentResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(ToString::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read upload: {e}")))?;

        let (entry, key) = state.entries().attach(id, &user, &filename, &data).await?;

        state.metrics().attachment_uploads.inc();
        state
            .metrics()
            .attachment_upload_bytes
            .inc_by(data.len() as u64);

        return Ok((
            StatusCode::CREATED,
            Json(AttachmentResponse {
                url: state.attachments().public_url(&key),
                key,
                entry,
            }),
        ));
    }

    Err(AppError::BadRequest("missing file field".to_string()))
}

/// Remove one attachment from an entry. Owner only.
async fn delete_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, file)): Path<(Uuid, String)>,
) -> AppResult<Json<Entry>> {
    let key = format!("{id}/{file}");
    let entry = state.entries().detach(id, &user, &key).await?;
    Ok(Json(entry))
}
