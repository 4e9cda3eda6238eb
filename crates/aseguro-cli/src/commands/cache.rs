//! Cache command

use crate::app::{CacheAction, CacheArgs};
use anyhow::Result;
use aseguro_core::classify::{CHITCHAT_CORPUS_ID, SECURITY_CORPUS_ID};
use aseguro_core::{Assistant, Config, Services};
use tokio_util::sync::CancellationToken;

pub async fn run(args: CacheArgs, config: &Config, cancel: &CancellationToken) -> Result<()> {
    let services = Services::from_config(config)?;

    match args.action {
        CacheAction::Warm => {
            let assistant = Assistant::from_services(config, &services);
            println!("Warming reference corpora in {}", config.cache_dir().display());
            for (corpus, phrases) in assistant.warm(cancel).await? {
                println!("  {:<12} {} phrases", corpus, phrases);
            }
            let stats = services.cache.stats();
            println!(
                "Loaded from disk: {}, embedded: {} ({} phrases)",
                stats.storage_hits, stats.regenerations, stats.embedded_phrases
            );
        }
        CacheAction::Clear => {
            for corpus in [SECURITY_CORPUS_ID, CHITCHAT_CORPUS_ID] {
                if services.cache.invalidate(corpus)? {
                    println!("Removed cached '{}' corpus", corpus);
                } else {
                    println!("No cached '{}' corpus", corpus);
                }
            }
        }
    }
    Ok(())
}
