//! Upload local files and directory trees to an article.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use attach_core::config::AppConfig;
use attach_core::error::AppError;
use attach_core::ArticleId;
use attach_entity::file::{PendingUpload, UploadEntry};
use attach_service::IngestOptions;

use crate::output::{self, OutputFormat};

/// Arguments for the ingest command
#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Owning article id
    #[arg(short, long)]
    pub article: ArticleId,

    /// Files or directories to upload. Directories keep their structure.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Previously stored attachments to keep in the selection
    #[arg(long = "keep")]
    pub keep: Vec<Uuid>,

    /// Remove the article's other attachments after the upload
    #[arg(long)]
    pub replace_all: bool,
}

/// Created attachment display row
#[derive(Debug, Serialize, Tabled)]
struct CreatedRow {
    /// Record id
    id: String,
    /// Path shown to users
    path: String,
    /// Size
    size: String,
    /// Storage key
    key: String,
}

/// Execute the ingest command
pub async fn execute(
    args: &IngestArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let context = super::build_service(config).await?;
    let service = &context.attachments;

    let mut entries: Vec<UploadEntry> = collect_uploads(&args.paths)
        .await?
        .into_iter()
        .map(UploadEntry::Pending)
        .collect();

    for id in &args.keep {
        let record = service.get(*id).await?;
        if record.article_id != args.article.into_uuid() {
            return Err(AppError::validation(format!(
                "Attachment {id} does not belong to article {}",
                args.article
            )));
        }
        entries.push(UploadEntry::Existing {
            record_id: record.id,
            virtual_path: record.virtual_path,
        });
    }

    println!(
        "Uploading {} entr{} to article {}...",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        args.article
    );

    let outcome = service
        .ingest(
            args.article,
            entries,
            IngestOptions {
                replace_all: args.replace_all,
            },
        )
        .await?;

    if format == OutputFormat::Json {
        output::print_json(&outcome, "{}");
        context.close().await;
        return Ok(());
    }

    let rows: Vec<CreatedRow> = outcome
        .created
        .iter()
        .map(|record| CreatedRow {
            id: record.id.to_string(),
            path: record.display_path(),
            size: output::format_bytes(u64::try_from(record.size_bytes).unwrap_or(0)),
            key: record.storage_key.clone(),
        })
        .collect();
    output::print_list(&rows, format);

    for skipped in &outcome.skipped {
        output::print_warning(&format!("Skipped {}: {}", skipped.name, skipped.reason));
    }
    for failure in &outcome.failed {
        output::print_error(&failure.to_string());
    }
    for failure in &outcome.removal_failures {
        output::print_warning(&format!(
            "Could not remove prior attachment {} ({}): {}",
            failure.record_id, failure.storage_key, failure.cause
        ));
    }
    if !outcome.removed_prior.is_empty() {
        output::print_kv("Removed prior", &outcome.removed_prior.len().to_string());
    }

    if outcome.is_complete() {
        output::print_success(&format!("{} file(s) stored.", outcome.created.len()));
    } else {
        output::print_warning(&format!(
            "{} file(s) stored, {} failed.",
            outcome.created.len(),
            outcome.failed.len()
        ));
    }

    context.close().await;
    Ok(())
}

/// Read every file named by `paths`.
///
/// A directory contributes all files beneath it, each with a relative path
/// that starts with the directory's own name.
pub async fn collect_uploads(paths: &[PathBuf]) -> Result<Vec<PendingUpload>, AppError> {
    let mut uploads = Vec::new();

    for path in paths {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AppError::not_found(format!("{}: {e}", path.display())))?;

        if metadata.is_file() {
            let name = file_name_of(path)?;
            let data = tokio::fs::read(path).await?;
            uploads.push(PendingUpload::new(name, data));
            continue;
        }

        let root_name = file_name_of(path)?;
        let mut dirs_to_visit = vec![path.clone()];
        while let Some(current_dir) = dirs_to_visit.pop() {
            let mut entries = tokio::fs::read_dir(&current_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let entry_path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    dirs_to_visit.push(entry_path);
                } else if file_type.is_file() {
                    let relative = relative_path(&root_name, path, &entry_path)?;
                    let data = tokio::fs::read(&entry_path).await?;
                    uploads.push(
                        PendingUpload::new(file_name_of(&entry_path)?, data)
                            .with_relative_path(relative),
                    );
                } else {
                    tracing::debug!(path = %entry_path.display(), "Skipping non-regular file");
                }
            }
        }
    }

    uploads.sort_by(|a, b| {
        a.relative_path
            .as_deref()
            .unwrap_or(&a.display_name)
            .cmp(b.relative_path.as_deref().unwrap_or(&b.display_name))
    });
    Ok(uploads)
}

fn file_name_of(path: &Path) -> Result<String, AppError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::validation(format!("Unusable file name: {}", path.display())))
}

/// `root_name/…` path of `entry` below `root`, always `/`-separated.
fn relative_path(root_name: &str, root: &Path, entry: &Path) -> Result<String, AppError> {
    let below = entry
        .strip_prefix(root)
        .map_err(|e| AppError::internal(format!("{}: {e}", entry.display())))?;
    let mut segments = vec![root_name.to_string()];
    for component in below.components() {
        let segment = component.as_os_str().to_str().ok_or_else(|| {
            AppError::validation(format!("Unusable file name: {}", entry.display()))
        })?;
        segments.push(segment.to_string());
    }
    Ok(segments.join("/"))
}
