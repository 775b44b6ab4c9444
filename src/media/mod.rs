//! Cover image storage.
//!
//! Uploaded covers are written verbatim to the media directory and served
//! statically under [`MEDIA_ROUTE`].

use std::path::{Path, PathBuf};

use crate::errors::AppError;

/// URL prefix the media directory is served under.
pub const MEDIA_ROUTE: &str = "/media";

/// Accepted cover content types and the file extension stored for each.
const COVER_TYPES: [(&str, &str); 5] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// File extension for an accepted cover content type.
pub fn cover_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    COVER_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

/// Filesystem-backed store for cover images.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the media directory if needed.
    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Store a cover for a game and return its public reference,
    /// e.g. `media/12_cover.png`.
    ///
    /// Covers previously stored for the game under another extension are removed.
    pub async fn save_cover(
        &self,
        game_id: i64,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        let ext = cover_extension(content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported cover type: {}", content_type))
        })?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Cover image is empty".to_string()));
        }

        self.ensure_dir().await?;

        for (_, other) in COVER_TYPES.iter().filter(|(_, e)| *e != ext) {
            let stale = self.dir.join(cover_file_name(game_id, other));
            if tokio::fs::try_exists(&stale).await.unwrap_or(false) {
                tokio::fs::remove_file(&stale).await?;
            }
        }

        let file_name = cover_file_name(game_id, ext);
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;
        tracing::info!("Stored cover for game {} ({} bytes)", game_id, bytes.len());

        Ok(format!("{}/{}", MEDIA_ROUTE.trim_start_matches('/'), file_name))
    }
}

fn cover_file_name(game_id: i64, ext: &str) -> String {
    format!("{}_cover.{}", game_id, ext)
}
