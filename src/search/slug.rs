//! Collection identifier derivation.

/// Derive a collection id from its display name.
///
/// The name is trimmed and lowercased, and every run of internal whitespace
/// becomes a single `-`. `"Jogos de Terror"` becomes `"jogos-de-terror"`.
/// Distinct names may derive the same id; callers must check for
/// collisions before storing.
pub fn derive_collection_id(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
