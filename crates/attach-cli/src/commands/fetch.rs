//! Download one stored object.

use std::path::PathBuf;

use clap::Args;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use attach_core::config::AppConfig;
use attach_core::error::AppError;

use crate::output;

/// Arguments for the fetch command
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Bucket holding the object; the configured bucket when omitted
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Object key, encoded or not
    #[arg(short, long)]
    pub key: String,

    /// Output file; the attachment's display name when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the fetch command
pub async fn execute(args: &FetchArgs, config: &AppConfig) -> Result<(), AppError> {
    let context = super::build_service(config).await?;
    let bucket = args.bucket.as_deref().unwrap_or(&config.storage.bucket);

    let mut fetched = context.attachments.fetch(bucket, &args.key).await?;
    let target = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&fetched.file_name));

    let mut file = tokio::fs::File::create(&target).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = fetched.stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    if let Some(expected) = fetched.size_bytes.filter(|expected| *expected != written) {
        output::print_warning(&format!(
            "Recorded size is {expected} bytes but {written} were read"
        ));
    }

    output::print_success(&format!(
        "Saved '{}' ({}, {}) to {}",
        fetched.file_name,
        output::format_bytes(written),
        fetched.content_type,
        target.display()
    ));

    context.close().await;
    Ok(())
}
