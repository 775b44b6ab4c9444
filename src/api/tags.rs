//! Tag API endpoints.

use axum::extract::State;

use super::{error, success, ApiResult};
use crate::AppState;

/// GET /tags - List every distinct tag used in the catalog, sorted.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_tags().await {
        Ok(tags) => success(tags, revision_id),
        Err(e) => error(e, revision_id),
    }
}
