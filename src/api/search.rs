//! Search API endpoints.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::models::Game;
use crate::search::{self, TagSelection};
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    pub q: String,
    /// Comma-joined tags every result must carry.
    #[serde(default)]
    pub tags: Option<String>,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Search result with games and metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Single search result item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub game: Game,
    pub score: u32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// GET /search - Rank games by relevance to a query.
pub async fn search_games(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Limit the maximum number of results
    let limit = params.limit.min(MAX_SEARCH_LIMIT);

    let games = match state.repo.list_games().await {
        Ok(games) => games,
        Err(e) => return error(e, revision_id),
    };

    let selected = TagSelection::from_param(params.tags.as_deref());
    let ranked = search::rank(&games, &params.q, &selected);
    let total = ranked.len();

    let results = ranked
        .into_iter()
        .skip(params.offset)
        .take(limit)
        .map(|hit| SearchResultItem {
            game: hit.game.clone(),
            score: hit.score,
        })
        .collect();

    success(
        SearchResponse {
            results,
            total,
            limit,
            offset: params.offset,
        },
        revision_id,
    )
}
