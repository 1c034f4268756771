//! Search route handlers.
//!
//! The dedicated search path is the listing with the free-text filter made
//! mandatory; everything else (scope, tag, mood, dates, paging) composes
//! the same way.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::query::RawListParams;
use crate::routes::entry::ListResponse;
use crate::state::AppState;

/// Create the search router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/entries/search", get(search_entries))
}

/// Search entries by free text.
///
/// GET /api/entries/search?q=rome&page_size=10&token=...
async fn search_entries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(raw): Query<RawListParams>,
) -> AppResult<Json<ListResponse>> {
    let params = raw.validate()?;

    if !params.has_text_filter() {
        return Err(AppError::BadRequest(
            "missing required search term: q".to_string(),
        ));
    }

    let page = state.entries().list(&user, &params).await?;

    state.metrics().pages_served.inc();
    Ok(Json(page.into()))
}
