//! Ingest command

use crate::app::IngestArgs;
use anyhow::{Context, Result};
use aseguro_core::store::load_passages_jsonl;
use aseguro_core::{Config, Embedder, Services};
use tokio_util::sync::CancellationToken;

pub async fn run(args: IngestArgs, config: &Config, cancel: &CancellationToken) -> Result<()> {
    let records = load_passages_jsonl(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    println!("Loaded {} passages from {}", records.len(), args.file.display());

    let services = Services::from_config(config)?;
    println!(
        "Embedding with {} into {}",
        services.embedder.model_name(),
        config.database_path().display()
    );

    let report = services.store.add_passages(&records, cancel).await?;

    println!("Ingest complete:");
    println!("  Inserted:      {}", report.inserted);
    println!("  Skipped:       {}", report.skipped);
    println!("  Total stored:  {}", services.store.count()?);
    Ok(())
}
