//! Ask command

use crate::app::{AskArgs, OutputFormat};
use crate::output::print_response;
use anyhow::Result;
use aseguro_core::{Assistant, Config};
use tokio_util::sync::CancellationToken;

pub async fn run(
    args: AskArgs,
    config: &Config,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let query = args.query.join(" ");
    let assistant = Assistant::from_config(config)?;

    let response = assistant.route_and_respond_with(&query, cancel).await?;
    print_response(&response, format)
}
