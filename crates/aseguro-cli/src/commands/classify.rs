//! Classify command: inspect routing decisions without generating

use crate::app::{ClassifyArgs, OutputFormat};
use anyhow::Result;
use aseguro_core::{Assistant, BlockReason, Config, SecurityVerdict};
use tokio_util::sync::CancellationToken;

pub async fn run(
    args: ClassifyArgs,
    config: &Config,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let text = args.text.join(" ");
    let assistant = Assistant::from_config(config)?;

    let verdict = assistant.security().screen_input(&text, cancel).await?;
    let intent = match (&verdict, assistant.chitchat()) {
        (SecurityVerdict::Blocked(_), _) | (_, None) => None,
        (_, Some(router)) => Some(router.detect(&text, cancel).await?),
    };

    let (status, reason, error) = match &verdict {
        SecurityVerdict::Allowed => ("allowed", None, None),
        SecurityVerdict::Blocked(reason) => ("blocked", Some(reason), None),
        SecurityVerdict::Degraded { error } => ("degraded", None, Some(error.as_str())),
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "text": text,
                "security": {
                    "status": status,
                    "reason": reason,
                    "error": error,
                },
                "chitchat": intent,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("Security:        {}", status);
            if let Some(reason) = reason {
                println!("  Gate:          {}", gate_name(reason));
                println!("  Trigger:       {}", reason.trigger());
                if let BlockReason::Semantic { score, .. } = reason {
                    println!("  Score:         {:.3}", score);
                }
            }
            if let Some(error) = error {
                println!("  Error:         {}", error);
            }
            match intent {
                Some(result) => match result.label {
                    Some(label) => println!("Chitchat:        {} ({:.3})", label, result.score),
                    None => println!("Chitchat:        none"),
                },
                None => println!("Chitchat:        skipped"),
            }
        }
    }
    Ok(())
}

fn gate_name(reason: &BlockReason) -> &'static str {
    match reason {
        BlockReason::Lexical { .. } => "lexical",
        BlockReason::Semantic { .. } => "semantic",
        BlockReason::SemanticUnavailable { .. } => "semantic (unavailable)",
        BlockReason::Output { .. } => "output",
    }
}
