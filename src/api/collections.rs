//! Collection API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{Collection, CreateCollectionRequest, Game};
use crate::search::derive_collection_id;
use crate::AppState;

/// GET /collections - List all collections in creation order.
pub async fn list_collections(State(state): State<AppState>) -> ApiResult<Vec<Collection>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_collections().await {
        Ok(collections) => success(collections, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /collections - Create a collection.
///
/// The id is derived from the name unless the client supplies one, and a
/// supplied id is normalized the same way. An id that already exists is
/// rejected with a conflict.
pub async fn create_collection(
    State(state): State<AppState>,
    Json(request): Json<CreateCollectionRequest>,
) -> ApiResult<Collection> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let collection = match collection_from_request(request) {
        Ok(collection) => collection,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.create_collection(&collection).await {
        Ok(created) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(created, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /collections/:id/games - Games belonging to a collection.
pub async fn list_collection_games(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Game>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_collection(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Collection {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    match state.repo.list_collection_games(&id).await {
        Ok(games) => success(games, revision_id),
        Err(e) => error(e, revision_id),
    }
}

fn collection_from_request(request: CreateCollectionRequest) -> Result<Collection, AppError> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Collection name is required".to_string()));
    }

    // Explicit ids go through the same normalization as derived ones
    let id = match request.id.as_deref().map(derive_collection_id) {
        Some(id) if !id.is_empty() => id,
        _ => derive_collection_id(&name),
    };
    if id.is_empty() {
        return Err(AppError::Validation(format!(
            "Collection name {:?} does not produce a usable id",
            name
        )));
    }
    if id.contains('/') {
        return Err(AppError::Validation(format!(
            "Collection id {:?} must not contain '/'",
            id
        )));
    }

    Ok(Collection {
        id,
        name,
        cover: request.cover,
        description: request.description,
    })
}
