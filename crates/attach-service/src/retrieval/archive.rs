//! Streaming ZIP archives of an article's attachments.
//!
//! The archive is assembled on a blocking task that writes into one half of
//! an in-memory pipe; the caller reads the other half. Payloads are copied
//! straight from the storage stream into the ZIP writer, so memory use stays
//! bounded by the pipe size regardless of file sizes.

use std::collections::HashSet;
use std::io::{Seek, Write};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::DuplexStream;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{info, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use attach_core::ArticleId;
use attach_core::error::{AppError, ErrorKind};
use attach_core::result::AppResult;
use attach_database::store::FileRecordStore;
use attach_entity::file::FileRecord;

use crate::error::FileFailure;

use super::resolver::{ResolvedFile, RetrievalResolver};

/// Capacity of the pipe between the archive writer and the reader.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Entry listing the files an archive is missing. Only written when some
/// file could not be retrieved.
pub const MISSING_FILES_ENTRY: &str = "MISSING_FILES.txt";

/// A record and the path it gets inside the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path inside the archive, relative to the scope.
    pub entry_path: String,
    /// The record to include.
    pub record: FileRecord,
}

/// What ended up in a finished archive.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveReport {
    /// Entry paths written, in archive order.
    pub included: Vec<String>,
    /// Files that could not be retrieved.
    pub skipped: Vec<FileFailure>,
    /// Path of the entry listing the skipped files, if one was written.
    pub manifest: Option<String>,
}

/// An archive being assembled.
#[derive(Debug)]
pub struct ArchiveStream {
    /// Suggested download file name, with `.zip`.
    pub file_name: String,
    /// Number of records selected by the scope.
    pub entry_count: usize,
    /// Archive bytes. Dropping it aborts assembly.
    pub reader: DuplexStream,
    /// Resolves once the archive is finalized.
    pub assembly: JoinHandle<AppResult<ArchiveReport>>,
}

/// Normalize a folder scope: no leading slash, one trailing slash, empty for
/// the whole article.
pub fn normalize_scope(scope: Option<&str>) -> String {
    let segments: Vec<&str> = scope
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        String::new()
    } else {
        format!("{}/", segments.join("/"))
    }
}

/// Select the records under `scope` and assign unique entry paths.
///
/// `scope` must be normalized. A record matches when its virtual path equals
/// the scope or is nested under it, so `sub/` does not match `subway/`.
pub fn plan_entries(records: Vec<FileRecord>, scope: &str) -> Vec<ArchiveEntry> {
    let mut used = HashSet::new();
    records
        .into_iter()
        .filter(|record| record.virtual_path.starts_with(scope))
        .map(|record| {
            let relative = &record.virtual_path[scope.len()..];
            let base = format!("{relative}{}", record.original_name);
            let entry_path = unique_path(&base, &mut used);
            ArchiveEntry { entry_path, record }
        })
        .collect()
}

/// Return `path`, or `path` with ` (n)` before the extension if taken.
fn unique_path(path: &str, used: &mut HashSet<String>) -> String {
    if used.insert(path.to_string()) {
        return path.to_string();
    }
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (format!("{dir}/"), name),
        None => (String::new(), path),
    };
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
        _ => (name, String::new()),
    };

    let mut n = 1;
    loop {
        let candidate = format!("{dir}{stem} ({n}){ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Suggested download name: `article-{id8}.zip` or `article-{id8}-{leaf}.zip`.
pub fn archive_file_name(article: ArticleId, scope: &str) -> String {
    let leaf = scope
        .split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .map(sanitize_file_name_part)
        .filter(|leaf| !leaf.is_empty());
    match leaf {
        Some(leaf) => format!("article-{}-{leaf}.zip", article.short_prefix()),
        None => format!("article-{}.zip", article.short_prefix()),
    }
}

fn sanitize_file_name_part(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

/// Builds scope-limited archives.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    /// Metadata store.
    store: Arc<dyn FileRecordStore>,
    /// Object resolution.
    resolver: RetrievalResolver,
}

impl ArchiveBuilder {
    /// Creates a new archive builder.
    pub fn new(store: Arc<dyn FileRecordStore>, resolver: RetrievalResolver) -> Self {
        Self { store, resolver }
    }

    /// Start building the archive of `article` limited to `scope`.
    ///
    /// Fails with `NotFound` when the scope holds no records and with an
    /// `Archive` error when none of them can be retrieved. Records that fail
    /// later are skipped and listed in the report.
    pub async fn build(&self, article: ArticleId, scope: Option<&str>) -> AppResult<ArchiveStream> {
        let scope = normalize_scope(scope);
        let records = self.store.list_by_article(article.into_uuid()).await?;
        let entries = plan_entries(records, &scope);
        if entries.is_empty() {
            return Err(AppError::not_found(format!(
                "No attachments of article {article} under '{scope}'"
            )));
        }
        let entry_count = entries.len();

        let mut remaining = entries.into_iter();
        let mut skipped = Vec::new();
        let mut first = None;
        for entry in remaining.by_ref() {
            match self.resolver.open(&entry.record).await {
                Ok(resolved) => {
                    first = Some((entry, resolved));
                    break;
                }
                Err(failure) => skipped.push(failure),
            }
        }
        let Some(first) = first else {
            return Err(FileFailure::ArchiveAssembly {
                scope,
                attempted: entry_count,
            }
            .into());
        };

        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        let assembly = Assembly {
            article,
            resolver: self.resolver.clone(),
            handle: Handle::current(),
            skipped,
        };
        let rest: Vec<ArchiveEntry> = remaining.collect();
        let task = tokio::task::spawn_blocking(move || assembly.run(writer, first, rest));

        info!(
            article_id = %article,
            scope = %scope,
            entries = entry_count,
            "Archive assembly started"
        );
        Ok(ArchiveStream {
            file_name: archive_file_name(article, &scope),
            entry_count,
            reader,
            assembly: task,
        })
    }
}

/// State of the blocking assembly task.
struct Assembly {
    article: ArticleId,
    resolver: RetrievalResolver,
    handle: Handle,
    skipped: Vec<FileFailure>,
}

impl Assembly {
    fn run(
        mut self,
        writer: DuplexStream,
        first: (ArchiveEntry, ResolvedFile),
        rest: Vec<ArchiveEntry>,
    ) -> AppResult<ArchiveReport> {
        let bridge = SyncIoBridge::new_with_handle(writer, self.handle.clone());
        let mut zip = ZipWriter::new_stream(bridge);
        let mut included = Vec::with_capacity(rest.len() + 1);

        let (entry, resolved) = first;
        self.write_entry(&mut zip, &entry, resolved)?;
        included.push(entry.entry_path);

        for entry in rest {
            match self.handle.block_on(self.resolver.open(&entry.record)) {
                Ok(resolved) => {
                    self.write_entry(&mut zip, &entry, resolved)?;
                    included.push(entry.entry_path);
                }
                Err(failure) => self.skipped.push(failure),
            }
        }

        let manifest = if self.skipped.is_empty() {
            None
        } else {
            let mut used: HashSet<String> = included.iter().cloned().collect();
            let path = unique_path(MISSING_FILES_ENTRY, &mut used);
            self.write_manifest(&mut zip, &path)?;
            Some(path)
        };

        let mut output = zip
            .finish()
            .map_err(|e| AppError::with_source(ErrorKind::Archive, "Failed to finalize archive", e))?;
        output.flush()?;
        drop(output);

        if !self.skipped.is_empty() {
            let names: Vec<&str> = self.skipped.iter().filter_map(FileFailure::file_name).collect();
            warn!(
                article_id = %self.article,
                skipped = self.skipped.len(),
                files = %names.join(", "),
                "Archive is missing files that could not be retrieved"
            );
        }
        info!(
            article_id = %self.article,
            included = included.len(),
            skipped = self.skipped.len(),
            "Archive assembly completed"
        );
        Ok(ArchiveReport {
            included,
            skipped: self.skipped,
            manifest,
        })
    }

    /// One line per skipped file, so the downloader sees what is missing.
    fn write_manifest<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        path: &str,
    ) -> AppResult<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(path, options).map_err(|e| {
            AppError::with_source(ErrorKind::Archive, "Failed to add missing-files entry", e)
        })?;
        for failure in &self.skipped {
            writeln!(zip, "{failure}")?;
        }
        Ok(())
    }

    fn write_entry<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        entry: &ArchiveEntry,
        resolved: ResolvedFile,
    ) -> AppResult<()> {
        let size = u64::try_from(entry.record.size_bytes).unwrap_or(0);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(size >= u64::from(u32::MAX));
        zip.start_file(entry.entry_path.as_str(), options)
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Archive,
                    format!("Failed to add {} to archive", entry.entry_path),
                    e,
                )
            })?;

        let reader = StreamReader::new(resolved.stream);
        let mut reader = SyncIoBridge::new_with_handle(reader, self.handle.clone());
        std::io::copy(&mut reader, zip)?;
        Ok(())
    }
}
