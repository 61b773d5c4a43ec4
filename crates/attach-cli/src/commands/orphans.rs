//! Find and purge stored objects that no attachment record points to.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use attach_core::ArticleId;
use attach_core::config::AppConfig;
use attach_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for the orphans command
#[derive(Debug, Args)]
pub struct OrphansArgs {
    /// Article whose key prefix is scanned
    #[arg(short, long)]
    pub article: ArticleId,

    /// Delete the orphaned objects
    #[arg(long)]
    pub purge: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Orphaned object display row
#[derive(Debug, Serialize, Tabled)]
struct OrphanRow {
    /// Storage key
    key: String,
    /// Size
    size: String,
    /// Last modified
    modified: String,
}

/// Execute the orphans command
pub async fn execute(
    args: &OrphansArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let context = super::build_service(config).await?;
    let service = &context.attachments;

    let orphans = service.find_orphans(args.article).await?;
    let rows: Vec<OrphanRow> = orphans
        .iter()
        .map(|object| OrphanRow {
            key: object.key.clone(),
            size: output::format_bytes(object.size_bytes),
            modified: object
                .last_modified
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    output::print_list(&rows, format);

    if args.purge && !orphans.is_empty() {
        let prompt = format!("Delete {} orphaned object(s)?", orphans.len());
        if super::confirm(&prompt, args.yes)? {
            let removed = service.purge_orphans(args.article).await?;
            output::print_success(&format!("Removed {} object(s).", removed.len()));
        } else {
            println!("Cancelled.");
        }
    }

    context.close().await;
    Ok(())
}
