//! Status command

use crate::app::OutputFormat;
use anyhow::Result;
use aseguro_core::{Config, Services};

pub async fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let services = Services::from_config(config)?;
    let passages = services.store.count()?;
    let insurers = services.store.insurers()?;
    let database = config.database_path();
    let cache_dir = config.cache_dir();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "passages": passages,
                "insurers": insurers,
                "database": database,
                "cache_dir": cache_dir,
                "llm_url": config.llm_service.url,
                "chat_model": config.llm_service.model,
                "embedding_model": config.llm_service.embedding_model,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("Passages:        {}", passages);
            println!("Insurers:        {}", insurers.join(", "));
            println!();
            println!("Database:        {}", database.display());
            println!("Embedding cache: {}", cache_dir.display());
            println!();
            println!("LLM service:     {}", config.llm_service.url);
            println!("  Chat model:    {}", config.llm_service.model);
            println!("  Embeddings:    {}", config.llm_service.embedding_model);
        }
    }
    Ok(())
}
