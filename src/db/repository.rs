//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Collection, Game, GameInput, RevisionInfo};
use crate::scoring::DetailedRating;

const GAME_COLUMNS: &str = "id, name, executable_path, folder_path, size_gb, cover_image, description, developer, studio, engine, version, genre, links, tags, collections, playtime_seconds, last_played, completed, review_text, detailed_rating, created_at, updated_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    // ==================== GAME OPERATIONS ====================

    /// List all games in insertion order.
    pub async fn list_games(&self) -> Result<Vec<Game>, AppError> {
        let sql = format!("SELECT {} FROM games ORDER BY id", GAME_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(game_from_row).collect())
    }

    /// Get a game by ID.
    pub async fn get_game(&self, id: i64) -> Result<Option<Game>, AppError> {
        let sql = format!("SELECT {} FROM games WHERE id = ?", GAME_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(game_from_row))
    }

    /// Create a new game. The identifier is assigned by the database.
    pub async fn create_game(&self, input: &GameInput) -> Result<Game, AppError> {
        let now = Utc::now().to_rfc3339();
        let encoded = EncodedSets::new(input)?;

        let result = sqlx::query(
            "INSERT INTO games (name, executable_path, folder_path, size_gb, cover_image, description, developer, studio, engine, version, genre, links, tags, collections, playtime_seconds, last_played, completed, review_text, detailed_rating, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&input.name)
        .bind(&input.executable_path)
        .bind(&input.folder_path)
        .bind(input.size_gb)
        .bind(&input.cover_image)
        .bind(&input.description)
        .bind(&input.developer)
        .bind(&input.studio)
        .bind(&input.engine)
        .bind(&input.version)
        .bind(&input.genre)
        .bind(&encoded.links)
        .bind(&encoded.tags)
        .bind(&encoded.collections)
        .bind(input.playtime_seconds)
        .bind(input.last_played.map(|t| t.to_rfc3339()))
        .bind(input.completed as i32)
        .bind(&input.review_text)
        .bind(&encoded.detailed_rating)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.increment_revision().await?;
        tracing::info!("Created game {} ({})", id, input.name);

        Ok(game_from_input(id, input, now.clone(), now))
    }

    /// Replace every field of an existing game.
    pub async fn update_game(&self, id: i64, input: &GameInput) -> Result<Game, AppError> {
        let existing = self
            .get_game(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game {} not found", id)))?;

        let now = Utc::now().to_rfc3339();
        let encoded = EncodedSets::new(input)?;

        let result = sqlx::query(
            "UPDATE games SET name = ?, executable_path = ?, folder_path = ?, size_gb = ?, cover_image = ?, description = ?, developer = ?, studio = ?, engine = ?, version = ?, genre = ?, links = ?, tags = ?, collections = ?, playtime_seconds = ?, last_played = ?, completed = ?, review_text = ?, detailed_rating = ?, updated_at = ? WHERE id = ?"
        )
        .bind(&input.name)
        .bind(&input.executable_path)
        .bind(&input.folder_path)
        .bind(input.size_gb)
        .bind(&input.cover_image)
        .bind(&input.description)
        .bind(&input.developer)
        .bind(&input.studio)
        .bind(&input.engine)
        .bind(&input.version)
        .bind(&input.genre)
        .bind(&encoded.links)
        .bind(&encoded.tags)
        .bind(&encoded.collections)
        .bind(input.playtime_seconds)
        .bind(input.last_played.map(|t| t.to_rfc3339()))
        .bind(input.completed as i32)
        .bind(&input.review_text)
        .bind(&encoded.detailed_rating)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Deleted between read and write
            return Err(AppError::NotFound(format!("Game {} not found", id)));
        }

        self.increment_revision().await?;

        Ok(game_from_input(id, input, existing.created_at, now))
    }

    /// Delete a game.
    pub async fn delete_game(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Game {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    /// Point a game's cover reference at a stored image.
    pub async fn set_cover(&self, id: i64, cover_image: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE games SET cover_image = ?, updated_at = ? WHERE id = ?")
            .bind(cover_image)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Game {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    /// Folder paths already registered in the catalog.
    pub async fn known_folder_paths(&self) -> Result<HashSet<String>, AppError> {
        let rows = sqlx::query("SELECT folder_path FROM games WHERE folder_path IS NOT NULL")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("folder_path"))
            .collect())
    }

    /// Create many games in one transaction, bumping the revision once.
    pub async fn create_games(&self, inputs: &[GameInput]) -> Result<Vec<Game>, AppError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(inputs.len());

        for input in inputs {
            let encoded = EncodedSets::new(input)?;
            let result = sqlx::query(
                "INSERT INTO games (name, executable_path, folder_path, links, tags, collections, detailed_rating, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
            )
            .bind(&input.name)
            .bind(&input.executable_path)
            .bind(&input.folder_path)
            .bind(&encoded.links)
            .bind(&encoded.tags)
            .bind(&encoded.collections)
            .bind(&encoded.detailed_rating)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            created.push(game_from_input(
                result.last_insert_rowid(),
                input,
                now.clone(),
                now.clone(),
            ));
        }

        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// All distinct tags across the catalog, sorted.
    pub async fn list_tags(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT tags FROM games ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        // Keyed by lowercase; the first spelling in catalog order wins
        let mut tags: BTreeMap<String, String> = BTreeMap::new();
        for tag in rows
            .iter()
            .flat_map(|row| parse_json_array(&row.get::<String, _>("tags")))
        {
            tags.entry(tag.to_lowercase()).or_insert(tag);
        }

        Ok(tags.into_values().collect())
    }

    // ==================== COLLECTION OPERATIONS ====================

    /// List collections in creation order.
    pub async fn list_collections(&self) -> Result<Vec<Collection>, AppError> {
        let rows = sqlx::query("SELECT id, name, cover, description FROM collections ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(collection_from_row).collect())
    }

    /// Get a collection by ID.
    pub async fn get_collection(&self, id: &str) -> Result<Option<Collection>, AppError> {
        let row = sqlx::query("SELECT id, name, cover, description FROM collections WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(collection_from_row))
    }

    /// Create a collection. An existing id is a conflict; nothing is overwritten.
    pub async fn create_collection(&self, collection: &Collection) -> Result<Collection, AppError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT OR IGNORE INTO collections (id, name, cover, description, created_at) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(&collection.id)
        .bind(&collection.name)
        .bind(&collection.cover)
        .bind(&collection.description)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict {
                message: format!("Collection {} already exists", collection.id),
                existing_id: collection.id.clone(),
            });
        }

        self.increment_revision().await?;
        tracing::info!("Created collection {}", collection.id);

        Ok(collection.clone())
    }

    /// Games that are members of a collection, in insertion order.
    pub async fn list_collection_games(&self, collection_id: &str) -> Result<Vec<Game>, AppError> {
        let games = self.list_games().await?;
        Ok(games
            .into_iter()
            .filter(|game| game.collections.iter().any(|c| c == collection_id))
            .collect())
    }
}

/// JSON-encoded set and rating columns of a game.
struct EncodedSets {
    links: String,
    tags: String,
    collections: String,
    detailed_rating: Option<String>,
}

impl EncodedSets {
    fn new(input: &GameInput) -> Result<Self, AppError> {
        Ok(Self {
            links: serde_json::to_string(&input.links)?,
            tags: serde_json::to_string(&input.tags)?,
            collections: serde_json::to_string(&input.collections)?,
            detailed_rating: input
                .detailed_rating
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        })
    }
}

// Helper functions for row conversion

fn game_from_input(id: i64, input: &GameInput, created_at: String, updated_at: String) -> Game {
    let mut game = Game {
        id,
        name: input.name.clone(),
        executable_path: input.executable_path.clone(),
        folder_path: input.folder_path.clone(),
        size_gb: input.size_gb,
        cover_image: input.cover_image.clone(),
        description: input.description.clone(),
        developer: input.developer.clone(),
        studio: input.studio.clone(),
        engine: input.engine.clone(),
        version: input.version.clone(),
        genre: input.genre.clone(),
        links: input.links.clone(),
        tags: input.tags.clone(),
        collections: input.collections.clone(),
        playtime_seconds: input.playtime_seconds,
        last_played: input.last_played,
        completed: input.completed,
        review_text: input.review_text.clone(),
        detailed_rating: input.detailed_rating,
        overall_score: 0.0,
        created_at,
        updated_at,
    };
    game.refresh_score();
    game
}

fn game_from_row(row: &sqlx::sqlite::SqliteRow) -> Game {
    let completed: i32 = row.get("completed");
    let last_played: Option<String> = row.get("last_played");
    let rating_str: Option<String> = row.get("detailed_rating");

    let mut game = Game {
        id: row.get("id"),
        name: row.get("name"),
        executable_path: row.get("executable_path"),
        folder_path: row.get("folder_path"),
        size_gb: row.get("size_gb"),
        cover_image: row.get("cover_image"),
        description: row.get("description"),
        developer: row.get("developer"),
        studio: row.get("studio"),
        engine: row.get("engine"),
        version: row.get("version"),
        genre: row.get("genre"),
        links: parse_json_array(&row.get::<String, _>("links")),
        tags: parse_json_array(&row.get::<String, _>("tags")),
        collections: parse_json_array(&row.get::<String, _>("collections")),
        playtime_seconds: row.get("playtime_seconds"),
        last_played: last_played.and_then(|s| parse_timestamp(&s)),
        completed: completed != 0,
        review_text: row.get("review_text"),
        detailed_rating: rating_str.and_then(|s| parse_rating(&s)),
        overall_score: 0.0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    };
    game.refresh_score();
    game
}

fn collection_from_row(row: &sqlx::sqlite::SqliteRow) -> Collection {
    Collection {
        id: row.get("id"),
        name: row.get("name"),
        cover: row.get("cover"),
        description: row.get("description"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn parse_rating(s: &str) -> Option<DetailedRating> {
    match serde_json::from_str::<DetailedRating>(s) {
        Ok(rating) => {
            let clamped = rating.clamped();
            if clamped != rating {
                tracing::warn!("Clamping out-of-range stored rating {:?}", rating);
            }
            Some(clamped)
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable detailed rating {:?}: {}", s, e);
            None
        }
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
