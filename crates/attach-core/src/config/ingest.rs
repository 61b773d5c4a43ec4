//! Upload ingestion configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Placeholders understood by `batch_folder_pattern`.
pub const PATTERN_PLACEHOLDERS: [&str; 2] = ["{prefix}", "{segment}"];

/// Ingestion policies applied by the upload orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Maximum number of files written concurrently within one batch.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_uploads: usize,
    /// Maximum display name length in characters.
    #[serde(default = "default_max_length")]
    pub max_name_length: usize,
    /// Maximum fully-qualified virtual path length in characters.
    #[serde(default = "default_max_length")]
    pub max_path_length: usize,
    /// Fail the whole batch when any entry has an invalid or oversized name.
    #[serde(default = "default_true")]
    pub reject_batch_on_invalid: bool,
    /// Template for the per-article batch container folder.
    #[serde(default = "default_batch_folder_pattern")]
    pub batch_folder_pattern: String,
    /// What a "replace all" ingest removes and how it handles failures.
    #[serde(default)]
    pub replace_all: ReplaceAllConfig,
    /// What happens to a stored object whose metadata row could not be written.
    #[serde(default)]
    pub on_metadata_failure: OrphanPolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: default_max_concurrent(),
            max_name_length: default_max_length(),
            max_path_length: default_max_length(),
            reject_batch_on_invalid: default_true(),
            batch_folder_pattern: default_batch_folder_pattern(),
            replace_all: ReplaceAllConfig::default(),
            on_metadata_failure: OrphanPolicy::default(),
        }
    }
}

impl IngestConfig {
    /// Reject templates that would render an unusable folder name.
    pub fn validate_pattern(&self) -> Result<(), AppError> {
        let pattern = self.batch_folder_pattern.trim();
        if pattern.is_empty() {
            return Err(AppError::configuration(
                "ingest.batch_folder_pattern must not be empty",
            ));
        }

        let mut literal = pattern.to_string();
        for placeholder in PATTERN_PLACEHOLDERS {
            literal = literal.replace(placeholder, "");
        }
        if literal.contains(['/', '\\', '{', '}']) {
            return Err(AppError::configuration(format!(
                "ingest.batch_folder_pattern contains invalid characters: {pattern}"
            )));
        }
        Ok(())
    }
}

/// Replace-all behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaceAllConfig {
    /// Which prior records are deleted.
    #[serde(default)]
    pub scope: ReplaceAllScope,
    /// What happens to a record whose storage object could not be deleted.
    #[serde(default)]
    pub on_delete_failure: DeleteFailurePolicy,
}

/// Which prior records a replace-all ingest removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceAllScope {
    /// Every prior record of the article.
    #[default]
    Everything,
    /// Every prior record except those referenced by `Existing` entries.
    KeepListed,
}

/// Handling of a failed storage delete during replace-all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteFailurePolicy {
    /// Delete the metadata row anyway; the object is left for the orphan scan.
    #[default]
    DropRecord,
    /// Keep the metadata row so a later delete can retry.
    RetainRecord,
}

/// Handling of a stored object whose metadata insert failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Leave the object and flag it in the outcome.
    #[default]
    Log,
    /// Delete the object immediately.
    RemoveObject,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_max_length() -> usize {
    250
}

fn default_true() -> bool {
    true
}

fn default_batch_folder_pattern() -> String {
    "{prefix}_{segment}".to_string()
}
