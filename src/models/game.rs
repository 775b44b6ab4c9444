//! Game record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{self, DetailedRating};

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Identifiers of the collections this game belongs to.
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub playtime_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_text: Option<String>,
    /// Absent means the game has not been reviewed yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_rating: Option<DetailedRating>,
    /// Derived from `detailed_rating`, never read from clients.
    #[serde(default, skip_deserializing)]
    pub overall_score: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl Game {
    /// Recompute the derived overall score from the current rating.
    pub fn refresh_score(&mut self) {
        self.overall_score = scoring::compute_overall_score(self.detailed_rating.as_ref());
    }
}

/// Request body for creating or replacing a game.
///
/// Both `POST /games` and `PUT /games/{id}` take the full record; any `id`
/// in the body is ignored in favour of the server-assigned or path id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInput {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub executable_path: Option<String>,
    #[serde(default)]
    pub folder_path: Option<String>,
    #[serde(default)]
    pub size_gb: Option<f64>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub studio: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub playtime_seconds: i64,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub review_text: Option<String>,
    #[serde(default)]
    pub detailed_rating: Option<DetailedRating>,
}

impl GameInput {
    /// Minimal input for a newly discovered game folder.
    pub fn discovered(name: String, folder_path: String, executable_path: String) -> Self {
        Self {
            name,
            folder_path: Some(folder_path),
            executable_path: Some(executable_path),
            ..Self::default()
        }
    }

    /// Remove repeated tags and collection ids, keeping first occurrences in order.
    ///
    /// Tags compare case-insensitively, so `RPG` and `rpg` are one tag and the
    /// first spelling is kept.
    pub fn dedup_sets(&mut self) {
        dedup_in_order(&mut self.tags, |tag| tag.to_lowercase());
        dedup_in_order(&mut self.collections, |id| id.to_string());
    }
}

fn dedup_in_order(values: &mut Vec<String>, key: impl Fn(&str) -> String) {
    let mut seen = std::collections::HashSet::new();
    values.retain(|v| seen.insert(key(v)));
}
