//! Revision information for change detection.

use serde::{Deserialize, Serialize};

/// Current catalog revision, bumped on every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}
