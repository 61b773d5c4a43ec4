//! Name and path validation for untrusted upload selections.
//!
//! Every check is pure. A candidate is accepted or rejected with the first
//! rule that matches, in this order:
//!
//! 1. empty name
//! 2. forbidden character in the name
//! 3. reserved device name (`CON`, `LPT1`, ...)
//! 4. system file name (`.gitignore`, `Thumbs.db`, ...)
//! 5. sensitive file name (`.env.local`, `secrets.json`, ...)
//! 6. name too long, then surrounding whitespace
//! 7. suspicious double extension (`report.pdf.exe`)
//! 8. system folder segment (`.git`, `node_modules`, ...)
//! 9. invalid folder segment (`.`, `..`, forbidden characters)
//! 10. fully-qualified virtual path too long
//!
//! The byte-size limit is checked last, during [`PathSanitizer::partition`].

use std::fmt;

use serde::Serialize;

use attach_core::config::IngestConfig;
use attach_entity::file::PendingUpload;

use super::key::virtual_path;

/// Characters that may not appear in a name or folder segment.
pub const FORBIDDEN_CHARACTERS: [char; 11] = ['/', '\\', ':', '*', '?', '"', '\'', '<', '>', '|', ';'];

const RESERVED_DEVICE_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const SYSTEM_FILES: [&str; 6] = [
    ".gitignore",
    "head",
    ".env",
    ".ds_store",
    "thumbs.db",
    "commit_editmsg",
];

const SYSTEM_FOLDERS: [&str; 5] = [".git", "node_modules", ".svn", ".hg", ".vscode"];

const DOCUMENT_EXTENSIONS: [&str; 24] = [
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "odt", "csv", "jpg", "jpeg",
    "png", "gif", "bmp", "svg", "mp3", "mp4", "wav", "avi", "mov", "zip", "stl",
];

const EXECUTABLE_EXTENSIONS: [&str; 12] = [
    "exe", "bat", "cmd", "com", "scr", "pif", "vbs", "js", "jar", "msi", "ps1", "sh",
];

/// The rule that rejected a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    /// The name is empty.
    EmptyName,
    /// The name contains a forbidden character.
    ForbiddenCharacter(char),
    /// The name's base is a reserved device name.
    ReservedDeviceName(String),
    /// The name is a well-known system file.
    SystemFile,
    /// The name looks like a credentials or environment file.
    SensitiveFile,
    /// The name exceeds the maximum length.
    NameTooLong {
        /// Length in characters.
        length: usize,
        /// Configured maximum.
        max: usize,
    },
    /// The name has leading or trailing whitespace.
    SurroundingWhitespace,
    /// A document extension is followed by an executable one.
    SuspiciousDoubleExtension(String),
    /// A folder segment is a system folder.
    SystemFolder(String),
    /// A folder segment is `.`, `..`, or contains a forbidden character.
    InvalidFolderSegment(String),
    /// The fully-qualified virtual path exceeds the maximum length.
    PathTooLong {
        /// Length in characters.
        length: usize,
        /// Configured maximum.
        max: usize,
    },
    /// The file exceeds the upload size limit.
    TooLarge {
        /// Size in bytes.
        size: u64,
        /// Configured maximum.
        max: u64,
    },
}

/// How a rejection is surfaced to the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectCategory {
    /// System or sensitive files and folders; silently dropped with a warning.
    SystemPath,
    /// Malformed names; an error.
    InvalidName,
    /// Oversized names, paths, or files; an error.
    TooLong,
}

impl RejectCategory {
    /// Whether rejections in this category are errors rather than warnings.
    pub fn is_error(self) -> bool {
        !matches!(self, Self::SystemPath)
    }
}

impl RejectReason {
    /// The category this reason belongs to.
    pub fn category(&self) -> RejectCategory {
        match self {
            Self::SystemFile | Self::SensitiveFile | Self::SystemFolder(_) => {
                RejectCategory::SystemPath
            }
            Self::NameTooLong { .. } | Self::PathTooLong { .. } | Self::TooLarge { .. } => {
                RejectCategory::TooLong
            }
            Self::EmptyName
            | Self::ForbiddenCharacter(_)
            | Self::ReservedDeviceName(_)
            | Self::SurroundingWhitespace
            | Self::SuspiciousDoubleExtension(_)
            | Self::InvalidFolderSegment(_) => RejectCategory::InvalidName,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name is empty"),
            Self::ForbiddenCharacter(c) => write!(f, "name contains forbidden character '{c}'"),
            Self::ReservedDeviceName(base) => write!(f, "'{base}' is a reserved device name"),
            Self::SystemFile => write!(f, "system file"),
            Self::SensitiveFile => write!(f, "sensitive file"),
            Self::NameTooLong { length, max } => {
                write!(f, "name is {length} characters long (max {max})")
            }
            Self::SurroundingWhitespace => write!(f, "name has leading or trailing whitespace"),
            Self::SuspiciousDoubleExtension(ext) => {
                write!(f, "suspicious double extension '{ext}'")
            }
            Self::SystemFolder(segment) => write!(f, "inside system folder '{segment}'"),
            Self::InvalidFolderSegment(segment) => write!(f, "invalid folder name '{segment}'"),
            Self::PathTooLong { length, max } => {
                write!(f, "path is {length} characters long (max {max})")
            }
            Self::TooLarge { size, max } => write!(f, "file is {size} bytes (max {max})"),
        }
    }
}

/// Something that can be checked by the sanitizer.
pub trait SanitizeCandidate {
    /// Display name of the file.
    fn display_name(&self) -> &str;
    /// Path relative to the selected directory, including the file name.
    fn relative_path(&self) -> Option<&str>;
    /// Size in bytes, when known.
    fn size_bytes(&self) -> Option<u64> {
        None
    }
}

impl SanitizeCandidate for PendingUpload {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn relative_path(&self) -> Option<&str> {
        self.relative_path.as_deref()
    }

    fn size_bytes(&self) -> Option<u64> {
        Some(self.size())
    }
}

/// A rejected candidate and the reason it was rejected.
#[derive(Debug, Clone, Serialize)]
pub struct Rejected<T> {
    /// The candidate.
    pub item: T,
    /// First rule it failed.
    pub reason: RejectReason,
}

/// Number of rejections per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    /// System files and folders.
    pub system_path: usize,
    /// Malformed names.
    pub invalid_name: usize,
    /// Oversized names, paths, or files.
    pub too_long: usize,
}

impl CategoryCounts {
    fn record(&mut self, category: RejectCategory) {
        match category {
            RejectCategory::SystemPath => self.system_path += 1,
            RejectCategory::InvalidName => self.invalid_name += 1,
            RejectCategory::TooLong => self.too_long += 1,
        }
    }

    /// Number of rejections that count as errors.
    pub fn errors(&self) -> usize {
        self.invalid_name + self.too_long
    }
}

/// Result of sanitizing a whole selection.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizeReport<T> {
    /// Candidates that passed every rule, in input order.
    pub accepted: Vec<T>,
    /// Candidates that failed a rule, in input order.
    pub rejected: Vec<Rejected<T>>,
    /// Rejections per category.
    pub counts: CategoryCounts,
}

impl<T> SanitizeReport<T> {
    /// Whether any rejection is an error rather than a warning.
    pub fn has_errors(&self) -> bool {
        self.counts.errors() > 0
    }
}

/// Validates display names and relative paths before any I/O.
#[derive(Debug, Clone)]
pub struct PathSanitizer {
    max_name_length: usize,
    max_path_length: usize,
    max_file_size: Option<u64>,
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default(), None)
    }
}

impl PathSanitizer {
    /// Build a sanitizer from the ingest limits and an optional byte limit.
    pub fn from_config(config: &IngestConfig, max_file_size: Option<u64>) -> Self {
        Self {
            max_name_length: config.max_name_length,
            max_path_length: config.max_path_length,
            max_file_size,
        }
    }

    /// Check one candidate.
    ///
    /// `label` is the batch container folder the file would be stored under.
    pub fn check(
        &self,
        display_name: &str,
        relative_path: Option<&str>,
        label: &str,
    ) -> Result<(), RejectReason> {
        check_name(display_name, self.max_name_length)?;

        let folders = folder_segments(relative_path);
        if let Some(segment) = folders.iter().find(|s| SYSTEM_FOLDERS.contains(*s)) {
            return Err(RejectReason::SystemFolder((*segment).to_string()));
        }
        if let Some(segment) = folders.iter().find(|s| !is_valid_folder_segment(s)) {
            return Err(RejectReason::InvalidFolderSegment((*segment).to_string()));
        }

        let length = qualified_length(label, relative_path, display_name);
        if length > self.max_path_length {
            return Err(RejectReason::PathTooLong {
                length,
                max: self.max_path_length,
            });
        }
        Ok(())
    }

    /// Check a candidate, including its size.
    pub fn check_candidate<T: SanitizeCandidate>(
        &self,
        candidate: &T,
        label: &str,
    ) -> Result<(), RejectReason> {
        self.check(candidate.display_name(), candidate.relative_path(), label)?;
        if let (Some(size), Some(max)) = (candidate.size_bytes(), self.max_file_size) {
            if size > max {
                return Err(RejectReason::TooLarge { size, max });
            }
        }
        Ok(())
    }

    /// Split a selection into accepted and rejected candidates.
    ///
    /// Running it again over either side yields the same split.
    pub fn partition<T: SanitizeCandidate>(&self, items: Vec<T>, label: &str) -> SanitizeReport<T> {
        let mut report = SanitizeReport {
            accepted: Vec::with_capacity(items.len()),
            rejected: Vec::new(),
            counts: CategoryCounts::default(),
        };

        for item in items {
            match self.check_candidate(&item, label) {
                Ok(()) => report.accepted.push(item),
                Err(reason) => {
                    report.counts.record(reason.category());
                    report.rejected.push(Rejected { item, reason });
                }
            }
        }
        report
    }
}

fn check_name(name: &str, max_length: usize) -> Result<(), RejectReason> {
    if name.is_empty() {
        return Err(RejectReason::EmptyName);
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARACTERS.contains(c)) {
        return Err(RejectReason::ForbiddenCharacter(c));
    }

    let base = name.split('.').next().unwrap_or(name).trim();
    if RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(base))
    {
        return Err(RejectReason::ReservedDeviceName(base.to_string()));
    }

    let lower = name.to_lowercase();
    if SYSTEM_FILES.contains(&lower.as_str()) {
        return Err(RejectReason::SystemFile);
    }
    if is_sensitive(&lower) {
        return Err(RejectReason::SensitiveFile);
    }

    let length = name.chars().count();
    if length > max_length {
        return Err(RejectReason::NameTooLong {
            length,
            max: max_length,
        });
    }
    if name.trim() != name {
        return Err(RejectReason::SurroundingWhitespace);
    }

    if let Some(ext) = suspicious_double_extension(&lower) {
        return Err(RejectReason::SuspiciousDoubleExtension(ext));
    }
    Ok(())
}

fn is_sensitive(lower: &str) -> bool {
    lower.starts_with(".env.") || lower.ends_with(".env") || lower.contains("secrets.")
}

/// Return `doc.exe` style extension pairs.
fn suspicious_double_extension(lower: &str) -> Option<String> {
    let parts: Vec<&str> = lower.split('.').collect();
    if parts.len() < 3 {
        return None;
    }
    let inner = parts[parts.len() - 2];
    let outer = parts[parts.len() - 1];
    (DOCUMENT_EXTENSIONS.contains(&inner) && EXECUTABLE_EXTENSIONS.contains(&outer))
        .then(|| format!(".{inner}.{outer}"))
}

fn is_valid_folder_segment(segment: &str) -> bool {
    segment != "." && segment != ".." && !segment.contains(FORBIDDEN_CHARACTERS)
}

/// Folder segments of a relative path, without the trailing file name.
pub(crate) fn folder_segments(relative_path: Option<&str>) -> Vec<&str> {
    let Some(relative) = relative_path else {
        return Vec::new();
    };
    let mut segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    segments
}

fn qualified_length(label: &str, relative_path: Option<&str>, name: &str) -> usize {
    virtual_path(label, relative_path).chars().count() + name.chars().count()
}
