//! Physical storage keys and virtual paths for uploaded files.
//!
//! A storage key never depends on the virtual path, so folders can be
//! reorganized without moving objects.

use std::borrow::Cow;
use std::sync::atomic::{AtomicI64, Ordering};

use attach_core::ArticleId;
use attach_core::config::IngestConfig;

use super::sanitizer::folder_segments;

/// Percent-encode one key segment canonically.
///
/// The segment is decoded first, so encoding an already-encoded segment
/// returns it unchanged. Unreserved characters (`A-Z a-z 0-9 - . _ ~`) are
/// kept as-is.
pub fn canonical_encode(segment: &str) -> String {
    let decoded = urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment));
    urlencoding::encode(&decoded).into_owned()
}

/// Canonically encode every `/`-separated segment of a key.
pub fn canonical_key(key: &str) -> String {
    key.split('/')
        .map(canonical_encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Template for the per-article batch container folder.
///
/// `{prefix}` renders as the first eight characters of the article id and
/// `{segment}` as the first four characters of its second dash-delimited
/// segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFolderPattern {
    template: String,
}

impl Default for BatchFolderPattern {
    fn default() -> Self {
        Self::new("{prefix}_{segment}")
    }
}

impl BatchFolderPattern {
    /// Create a pattern from a template string.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Build the pattern configured for ingestion.
    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.batch_folder_pattern.trim())
    }

    /// Render the container folder label for an article.
    pub fn render(&self, article: ArticleId) -> String {
        self.template
            .replace("{prefix}", &article.short_prefix())
            .replace("{segment}", &article.second_segment())
    }
}

/// Virtual folder path for a file: `{label}/{folders}/`.
///
/// Files picked without a relative path live at the root (empty path).
pub fn virtual_path(label: &str, relative_path: Option<&str>) -> String {
    if relative_path.is_none() {
        return String::new();
    }
    let mut path = String::new();
    for segment in std::iter::once(label)
        .filter(|l| !l.is_empty())
        .chain(folder_segments(relative_path))
    {
        path.push_str(segment);
        path.push('/');
    }
    path
}

/// Allocates collision-free storage keys.
///
/// Timestamps handed out by one allocator strictly increase, so two files
/// with the same name never share a key even within one millisecond.
#[derive(Debug, Default)]
pub struct StorageKeyAllocator {
    last_millis: AtomicI64,
}

impl StorageKeyAllocator {
    /// Create a new allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a key for `original_name` using the current time.
    pub fn allocate(&self, article: ArticleId, original_name: &str) -> String {
        self.allocate_at(article, original_name, chrono::Utc::now().timestamp_millis())
    }

    /// Allocate a key as if the current time were `now_millis`.
    pub fn allocate_at(&self, article: ArticleId, original_name: &str, now_millis: i64) -> String {
        let timestamp = self.next_timestamp(now_millis);
        format!("{article}/{timestamp}_{}", canonical_encode(original_name))
    }

    fn next_timestamp(&self, now_millis: i64) -> i64 {
        let mut last = self.last_millis.load(Ordering::Relaxed);
        loop {
            let next = now_millis.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Recover a display name from the last segment of a storage key.
///
/// Strips the `{timestamp}_` prefix and percent-decodes the rest.
pub fn name_from_key(key: &str) -> String {
    let last = key.rsplit('/').next().unwrap_or(key);
    let name = match last.split_once('_') {
        Some((timestamp, rest))
            if !timestamp.is_empty() && timestamp.bytes().all(|b| b.is_ascii_digit()) =>
        {
            rest
        }
        _ => last,
    };
    urlencoding::decode(name)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| name.to_string())
}
