//! Retrieval-augmented answering and multi-insurer comparison

mod comparison;
pub mod prompts;
mod rerank;
mod retrieval;

pub use comparison::{
    normalize_insurers, parse_comparison_rows, ComparisonOutcome, ComparisonPipeline,
    ComparisonResult, ComparisonRow, MAX_VALUE_WORDS,
};
pub use prompts::{NOT_SPECIFIED, NO_INFORMATION_MESSAGE};
pub use rerank::parse_rerank_indices;
pub use retrieval::{RetrievalOutcome, RetrievalPipeline};
