//! Library folder scanning.
//!
//! Each immediate sub-directory of a library root is treated as one game
//! folder. A folder becomes a catalog entry when it contains a Windows
//! executable anywhere below it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::AppError;
use crate::models::GameInput;

const EXECUTABLE_EXTENSION: &str = "exe";

/// A game folder found on disk that is not yet in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredGame {
    pub name: String,
    pub folder_path: String,
    pub executable_path: String,
}

impl From<DiscoveredGame> for GameInput {
    fn from(found: DiscoveredGame) -> Self {
        GameInput::discovered(found.name, found.folder_path, found.executable_path)
    }
}

/// Scan `root` for game folders, skipping folders listed in `known`.
///
/// Blocking; run it on the blocking pool.
pub fn scan_library(root: &Path, known: &HashSet<String>) -> Result<Vec<DiscoveredGame>, AppError> {
    if !root.is_dir() {
        return Err(AppError::Validation(format!(
            "Library path {} is not a directory",
            root.display()
        )));
    }

    let mut folders: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();

    let mut found = Vec::new();
    for folder in folders {
        let folder_path = folder.to_string_lossy().into_owned();
        if known.contains(&folder_path) {
            continue;
        }

        let Some(executable) = first_executable(&folder) else {
            tracing::debug!("No executable under {}", folder_path);
            continue;
        };

        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| folder_path.clone());

        found.push(DiscoveredGame {
            name,
            folder_path,
            executable_path: executable.to_string_lossy().into_owned(),
        });
    }

    Ok(found)
}

/// First `.exe` file below `folder`, walking in file-name order.
fn first_executable(folder: &Path) -> Option<PathBuf> {
    WalkDir::new(folder)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| is_executable(entry.path()))
        .map(|entry| entry.into_path())
}

fn is_executable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXECUTABLE_EXTENSION))
}
