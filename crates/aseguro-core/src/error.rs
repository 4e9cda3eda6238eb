//! Error types for aseguro

use thiserror::Error;

/// Result type alias using AseguroError
pub type Result<T> = std::result::Result<T, AseguroError>;

/// Error type alias for convenience
pub type Error = AseguroError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const CANCELLED: i32 = 4;
}

/// Main error type for aseguro
#[derive(Debug, Error)]
pub enum AseguroError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("Cancelled during {0}")]
    Cancelled(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AseguroError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::Cancelled(_) => exit_codes::CANCELLED,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Upstream failures (network, quota, model errors) that a caller may
    /// recover from with a fallback or a retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::ExternalError(_) | Self::Llm(_) | Self::Embedding(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            AseguroError::InvalidInput("x".into()).exit_code(),
            exit_codes::INVALID_INPUT
        );
        assert_eq!(
            AseguroError::Cancelled("rerank".into()).exit_code(),
            exit_codes::CANCELLED
        );
        assert_eq!(
            AseguroError::Parse("bad".into()).exit_code(),
            exit_codes::GENERAL_ERROR
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(AseguroError::ExternalError("429".into()).is_transient());
        assert!(AseguroError::Embedding("timeout".into()).is_transient());
        assert!(!AseguroError::Config("bad".into()).is_transient());
        assert!(!AseguroError::Cancelled("generation".into()).is_transient());
    }
}
