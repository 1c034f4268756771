//! Attachment serving route handlers.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::file::AttachmentService;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Create the file router.
pub fn router() -> Router<AppState> {
    Router::new().route("/files/{*key}", get(serve_attachment))
}

/// Serve an attachment's bytes.
///
/// Keys are `<entry-id>/<file>`; access follows the owning entry's
/// visibility rules, so a key leaking does not leak the blob.
async fn serve_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
) -> AppResult<Response> {
    let Some((entry_id, _)) = key.split_once('/') else {
        return Err(AppError::NotFound);
    };
    let id: Uuid = entry_id.parse().map_err(|_| AppError::NotFound)?;

    let entry = state.entries().load_for_view(id, &user).await?;
    if !entry.attachments.iter().any(|k| k == &key) {
        return Err(AppError::NotFound);
    }

    let data = state.attachments().fetch(&key).await?;
    let content_type = AttachmentService::content_type(&data);

    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}
