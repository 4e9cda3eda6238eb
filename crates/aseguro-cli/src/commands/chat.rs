//! Interactive chat loop

use crate::app::OutputFormat;
use crate::output::print_response;
use anyhow::Result;
use aseguro_core::{AseguroError, Assistant, Config};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

const EXIT_WORDS: [&str; 3] = ["salir", "exit", "quit"];

pub async fn run(config: &Config, format: OutputFormat, cancel: &CancellationToken) -> Result<()> {
    let assistant = Assistant::from_config(config)?;

    // Load the reference corpora before the first question
    if let Err(e) = assistant.warm(cancel).await {
        if matches!(e, AseguroError::Cancelled(_)) {
            return Ok(());
        }
        tracing::warn!(error = %e, "could not warm reference corpora");
    }

    eprintln!("Aseguro. Escribe tu pregunta ('salir' para terminar).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&query.to_lowercase().as_str()) {
            break;
        }

        match assistant.route_and_respond_with(query, cancel).await {
            Ok(response) => print_response(&response, format)?,
            Err(AseguroError::Cancelled(_)) => break,
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}
