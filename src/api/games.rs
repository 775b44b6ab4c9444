//! Game API endpoints.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{Game, GameInput};
use crate::search::{self, TagSelection};
use crate::AppState;

/// Multipart field carrying the cover image.
const COVER_FIELD: &str = "file";

/// Catalog listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct GameListQuery {
    /// Free-text query matched against name, studio and description.
    #[serde(default)]
    pub q: Option<String>,
    /// Comma-joined tags; a game must carry all of them.
    #[serde(default)]
    pub tags: Option<String>,
}

/// Random pick query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct RandomQuery {
    #[serde(default)]
    pub tags: Option<String>,
}

/// Result of a cover upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverResponse {
    pub cover_image: String,
}

/// GET /games - List games, optionally filtered by text and tags.
pub async fn list_games(
    State(state): State<AppState>,
    Query(params): Query<GameListQuery>,
) -> ApiResult<Vec<Game>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let games = match state.repo.list_games().await {
        Ok(games) => games,
        Err(e) => return error(e, revision_id),
    };

    let selected = TagSelection::from_param(params.tags.as_deref());
    let query = params.q.as_deref().unwrap_or_default();
    let visible = search::filter(&games, query, &selected)
        .into_iter()
        .cloned()
        .collect();

    success(visible, revision_id)
}

/// GET /games/random - One game picked uniformly among those carrying the given tags.
pub async fn random_game(
    State(state): State<AppState>,
    Query(params): Query<RandomQuery>,
) -> ApiResult<Option<Game>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let games = match state.repo.list_games().await {
        Ok(games) => games,
        Err(e) => return error(e, revision_id),
    };

    let selected = TagSelection::from_param(params.tags.as_deref());
    let candidates = search::filter(&games, "", &selected);
    let picked = search::pick_random(&candidates, &mut rand::thread_rng()).map(|g| (*g).clone());

    success(picked, revision_id)
}

/// GET /games/:id - Get a single game.
pub async fn get_game(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Game> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_game(id).await {
        Ok(Some(game)) => success(game, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Game {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /games - Create a new game. The server assigns the id.
pub async fn create_game(
    State(state): State<AppState>,
    Json(mut request): Json<GameInput>,
) -> ApiResult<Game> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = validate_game_input(&mut request) {
        return error(e, revision_id);
    }
    if let Some(client_id) = request.id.filter(|id| *id != 0) {
        tracing::debug!("Ignoring client-supplied id {} on create", client_id);
    }

    match state.repo.create_game(&request).await {
        Ok(game) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(game, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /games/:id - Replace a game. The path id wins over any id in the body.
pub async fn update_game(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut request): Json<GameInput>,
) -> ApiResult<Game> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = validate_game_input(&mut request) {
        return error(e, revision_id);
    }

    match state.repo.update_game(id, &request).await {
        Ok(game) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(game, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /games/:id - Delete a game.
pub async fn delete_game(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_game(id).await {
        Ok(()) => {
            tracing::info!("Deleted game {}", id);
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /games/:id/cover - Upload a cover image as multipart field `file`.
pub async fn upload_cover(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<CoverResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match store_cover(&state, id, multipart).await {
        Ok(cover_image) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(CoverResponse { cover_image }, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

async fn store_cover(state: &AppState, id: i64, mut multipart: Multipart) -> Result<String, AppError> {
    if state.repo.get_game(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Game {} not found", id)));
    }

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(COVER_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        let cover_image = state.media.save_cover(id, &content_type, &bytes).await?;
        state.repo.set_cover(id, &cover_image).await?;
        return Ok(cover_image);
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{}'",
        COVER_FIELD
    )))
}

/// Validate and normalize an incoming game before it is stored.
pub(crate) fn validate_game_input(input: &mut GameInput) -> Result<(), AppError> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(AppError::Validation("Game name is required".to_string()));
    }
    if let Some(rating) = &input.detailed_rating {
        rating.validate().map_err(AppError::Validation)?;
    }
    if input.playtime_seconds < 0 {
        return Err(AppError::Validation(
            "Playtime cannot be negative".to_string(),
        ));
    }
    if input.size_gb.is_some_and(|size| size < 0.0 || !size.is_finite()) {
        return Err(AppError::Validation(
            "Size must be a non-negative number".to_string(),
        ));
    }

    for tag in &mut input.tags {
        *tag = tag.trim().to_string();
    }
    input.tags.retain(|tag| !tag.is_empty());
    input.dedup_sets();
    Ok(())
}
