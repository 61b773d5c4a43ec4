//! Download an article's attachments as a ZIP archive.

use std::path::PathBuf;

use clap::Args;

use attach_core::ArticleId;
use attach_core::config::AppConfig;
use attach_core::error::AppError;

use crate::output;

/// Arguments for the archive command
#[derive(Debug, Args)]
pub struct ArchiveArgs {
    /// Owning article id
    #[arg(short, long)]
    pub article: ArticleId,

    /// Folder to archive, e.g. `sub/deep`; the whole article when omitted
    #[arg(short, long)]
    pub scope: Option<String>,

    /// Output file; the suggested archive name when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the archive command
pub async fn execute(args: &ArchiveArgs, config: &AppConfig) -> Result<(), AppError> {
    let context = super::build_service(config).await?;

    let mut archive = context
        .attachments
        .archive(args.article, args.scope.as_deref())
        .await?;
    let target = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&archive.file_name));

    println!(
        "Archiving {} file(s) to {}...",
        archive.entry_count,
        target.display()
    );

    let mut file = tokio::fs::File::create(&target).await?;
    let written = tokio::io::copy(&mut archive.reader, &mut file).await?;

    let report = archive
        .assembly
        .await
        .map_err(|e| AppError::internal(format!("Archive task failed: {e}")))??;

    for skipped in &report.skipped {
        output::print_warning(&skipped.to_string());
    }
    output::print_success(&format!(
        "Wrote {} entr{} ({}) to {}",
        report.included.len(),
        if report.included.len() == 1 { "y" } else { "ies" },
        output::format_bytes(written),
        target.display()
    ));

    context.close().await;
    Ok(())
}
