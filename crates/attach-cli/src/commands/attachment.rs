//! Attachment inspection and deletion commands.

use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use attach_core::ArticleId;
use attach_core::config::AppConfig;
use attach_core::error::AppError;
use attach_entity::file::FileRecord;
use attach_entity::folder::FolderNode;

use crate::output::{self, OutputFormat};

/// Attachment subcommands
#[derive(Debug, Subcommand)]
pub enum AttachmentCommand {
    /// List an article's attachments
    List {
        /// Owning article id
        #[arg(short, long)]
        article: ArticleId,
    },
    /// Show an article's attachments as a folder tree
    Tree {
        /// Owning article id
        #[arg(short, long)]
        article: ArticleId,
    },
    /// Show one attachment
    Show {
        /// Attachment id
        id: Uuid,
    },
    /// Delete one attachment and its stored object
    Delete {
        /// Attachment id
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Attachment display row
#[derive(Debug, Serialize, Tabled)]
struct AttachmentRow {
    /// Record id
    id: String,
    /// Path shown to users
    path: String,
    /// Size
    size: String,
    /// MIME type
    content_type: String,
    /// Upload time
    created: String,
}

impl From<&FileRecord> for AttachmentRow {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id.to_string(),
            path: record.display_path(),
            size: output::format_bytes(u64::try_from(record.size_bytes).unwrap_or(0)),
            content_type: record.content_type.clone(),
            created: record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Execute attachment commands
pub async fn execute(
    command: &AttachmentCommand,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let context = super::build_service(config).await?;
    let service = &context.attachments;

    match command {
        AttachmentCommand::List { article } => {
            let records = service.list(*article).await?;
            let rows: Vec<AttachmentRow> = records.iter().map(AttachmentRow::from).collect();
            output::print_list(&rows, format);
        }
        AttachmentCommand::Tree { article } => {
            let tree = service.tree(*article).await?;
            match format {
                OutputFormat::Json => output::print_json(&tree, "{}"),
                OutputFormat::Table => {
                    if tree.file_count() == 0 {
                        println!("No results found.");
                    } else {
                        for line in render_tree(&tree) {
                            println!("{line}");
                        }
                        println!(
                            "\n{} file(s) in {} folder(s)",
                            tree.file_count(),
                            tree.folder_count()
                        );
                    }
                }
            }
        }
        AttachmentCommand::Show { id } => {
            let record = service.get(*id).await?;
            match format {
                OutputFormat::Json => output::print_json(&record, "{}"),
                OutputFormat::Table => {
                    println!("Attachment {}", record.id);
                    output::print_kv("Article", &record.article_id.to_string());
                    output::print_kv("Name", &record.original_name);
                    output::print_kv("Folder", &record.virtual_path);
                    output::print_kv("Bucket", &record.bucket);
                    output::print_kv("Storage key", &record.storage_key);
                    output::print_kv("Size", &record.size_bytes.to_string());
                    output::print_kv("Content type", &record.content_type);
                    output::print_kv("Created", &record.created_at.to_rfc3339());
                }
            }
        }
        AttachmentCommand::Delete { id, yes } => {
            let record = service.get(*id).await?;
            let prompt = format!("Delete attachment '{}'?", record.display_path());
            if !super::confirm(&prompt, *yes)? {
                println!("Cancelled.");
                context.close().await;
                return Ok(());
            }
            let deleted = service.delete(*id).await?;
            output::print_success(&format!("Deleted '{}'.", deleted.display_path()));
        }
    }

    context.close().await;
    Ok(())
}

/// Indented text rendering of a folder tree.
fn render_tree(tree: &FolderNode<FileRecord>) -> Vec<String> {
    let mut lines = Vec::new();
    render_node(tree, 0, &mut lines);
    lines
}

fn render_node(node: &FolderNode<FileRecord>, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for (name, child) in &node.folders {
        lines.push(format!("{indent}{name}/"));
        render_node(child, depth + 1, lines);
    }
    for record in &node.files {
        lines.push(format!(
            "{indent}{} ({})",
            record.original_name,
            output::format_bytes(u64::try_from(record.size_bytes).unwrap_or(0))
        ));
    }
}
