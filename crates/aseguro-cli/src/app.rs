//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aseguro")]
#[command(
    author,
    version,
    about = "Insurance policy assistant with semantic security filtering"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "ASEGURO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask one question
    Ask(AskArgs),

    /// Interactive session (type 'salir' to quit)
    Chat,

    /// Compare a feature across insurers
    Compare(CompareArgs),

    /// Load pre-chunked passages from a JSON-lines file
    Ingest(IngestArgs),

    /// Show how the security filter and chitchat router see a text
    Classify(ClassifyArgs),

    /// Manage the reference-phrase embedding cache
    Cache(CacheArgs),

    /// Show store and configuration status
    Status,
}

#[derive(Args)]
pub struct AskArgs {
    /// Question text
    #[arg(required = true)]
    pub query: Vec<String>,
}

#[derive(Args)]
pub struct CompareArgs {
    /// Feature to compare, e.g. "deducible"
    pub feature: String,

    /// Insurer to include (repeatable)
    #[arg(short, long = "insurer", required = true)]
    pub insurers: Vec<String>,
}

#[derive(Args)]
pub struct IngestArgs {
    /// JSON-lines file with {text, insurer, page, source} records
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// Text to classify
    #[arg(required = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Embed (or load) the security and chitchat corpora
    Warm,
    /// Delete the persisted corpora so the next run re-embeds them
    Clear,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
    Md,
}
