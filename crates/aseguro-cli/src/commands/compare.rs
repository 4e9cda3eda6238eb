//! Compare command

use crate::app::{CompareArgs, OutputFormat};
use crate::output::print_response;
use anyhow::Result;
use aseguro_core::{Assistant, Config};
use tokio_util::sync::CancellationToken;

pub async fn run(
    args: CompareArgs,
    config: &Config,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let assistant = Assistant::from_config(config)?;

    let response = assistant
        .compare_with(&args.feature, &args.insurers, cancel)
        .await?;
    print_response(&response, format)
}
