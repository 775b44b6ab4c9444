//! Library scan API endpoint.

use std::path::PathBuf;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::GameInput;
use crate::scan::scan_library;
use crate::AppState;

/// Request body for a library scan.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Library root whose sub-directories are game folders.
    pub path: PathBuf,
}

/// Outcome of a library scan.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub status: String,
    pub games_added: usize,
    pub total_in_library: usize,
}

/// POST /scan - Register game folders found under a library root.
pub async fn scan_library_folder(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> ApiResult<ScanResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match run_scan(&state, request.path).await {
        Ok(response) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(response, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

async fn run_scan(state: &AppState, root: PathBuf) -> Result<ScanResponse, AppError> {
    let known = state.repo.known_folder_paths().await?;

    tracing::info!("Scanning library at {}", root.display());
    let found = tokio::task::spawn_blocking(move || scan_library(&root, &known)).await??;

    let inputs: Vec<GameInput> = found.into_iter().map(GameInput::from).collect();
    let created = state.repo.create_games(&inputs).await?;
    let total_in_library = state.repo.list_games().await?.len();
    tracing::info!(
        "Scan added {} games, {} in library",
        created.len(),
        total_in_library
    );

    Ok(ScanResponse {
        status: "Scan complete".to_string(),
        games_added: created.len(),
        total_in_library,
    })
}
