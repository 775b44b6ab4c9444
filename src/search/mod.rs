//! Catalog filtering and search.
//!
//! Everything here is a pure function over a catalog snapshot: filtering by
//! free text and tags, relevance ranking, random picks and collection id
//! derivation. Nothing touches storage.

mod random;
mod slug;

pub use random::*;
pub use slug::*;

use std::collections::BTreeSet;

use crate::models::Game;

/// Relevance points for a match in the game name.
const WEIGHT_NAME: u32 = 10;
/// Relevance points for a match in the studio.
const WEIGHT_STUDIO: u32 = 5;
/// Relevance points for a match in the description.
const WEIGHT_DESCRIPTION: u32 = 1;

/// A normalized set of selected tags.
///
/// Tags are compared case-insensitively; a game matches when it carries
/// every selected tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSelection {
    tags: BTreeSet<String>,
}

impl TagSelection {
    /// Parse a comma-joined tag list such as `"rpg,horror"`.
    ///
    /// Segments are trimmed and empty segments dropped.
    pub fn parse(raw: &str) -> Self {
        raw.split(',').collect()
    }

    /// Parse an optional query parameter; `None` selects nothing.
    pub fn from_param(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    /// True when `tags` is a superset of this selection.
    pub fn matches<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        let owned: BTreeSet<String> = tags.iter().map(|t| t.as_ref().to_lowercase()).collect();
        self.tags.is_subset(&owned)
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let tags = iter
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { tags }
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, Copy)]
pub struct SearchResult<'a> {
    pub game: &'a Game,
    pub score: u32,
}

fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(needle))
}

/// Case-insensitive text predicate over name, studio and description.
///
/// `needle` must already be lowercased.
fn text_matches(game: &Game, needle: &str) -> bool {
    contains_ci(Some(&game.name), needle)
        || contains_ci(game.studio.as_deref(), needle)
        || contains_ci(game.description.as_deref(), needle)
}

/// Compute the visible subset of a catalog.
///
/// A game is kept when it matches the text query (an empty or
/// whitespace-only query matches everything) and carries every selected tag.
/// Input order is preserved.
pub fn filter<'a>(catalog: &'a [Game], query: &str, selected: &TagSelection) -> Vec<&'a Game> {
    let needle = normalize_query(query);
    catalog
        .iter()
        .filter(|game| selected.matches(&game.tags))
        .filter(|game| needle.as_deref().map_or(true, |n| text_matches(game, n)))
        .collect()
}

/// Relevance of a game for an already lowercased query. Zero means no match.
pub fn relevance(game: &Game, needle: &str) -> u32 {
    let mut score = 0;
    if contains_ci(Some(&game.name), needle) {
        score += WEIGHT_NAME;
    }
    if contains_ci(game.studio.as_deref(), needle) {
        score += WEIGHT_STUDIO;
    }
    if contains_ci(game.description.as_deref(), needle) {
        score += WEIGHT_DESCRIPTION;
    }
    score
}

/// Rank the tag-filtered catalog by relevance to `query`.
///
/// Non-matching games are dropped. Ties keep catalog order. An empty query
/// yields no results.
pub fn rank<'a>(
    catalog: &'a [Game],
    query: &str,
    selected: &TagSelection,
) -> Vec<SearchResult<'a>> {
    let Some(needle) = normalize_query(query) else {
        return Vec::new();
    };

    let mut results: Vec<SearchResult<'a>> = catalog
        .iter()
        .filter(|game| selected.matches(&game.tags))
        .filter_map(|game| {
            let score = relevance(game, &needle);
            (score > 0).then_some(SearchResult { game, score })
        })
        .collect();

    // sort_by is stable
    results.sort_by(|a, b| b.score.cmp(&a.score));
    results
}
