//! Output formatters

pub mod json;
pub mod markdown;
pub mod terminal;

use crate::app::OutputFormat;
use anyhow::Result;
use aseguro_core::AssistantResponse;

/// Print one assistant response in the requested format
pub fn print_response(response: &AssistantResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print!("{}", json::format_response(response)),
        OutputFormat::Md => print!("{}", markdown::format_response(response)),
        OutputFormat::Cli => terminal::print_response(response)?,
    }
    Ok(())
}
