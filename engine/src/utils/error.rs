use crate::services::plan_analyzer::parser::error::ParseError;
use thiserror::Error;

/// Errors surfaced by the command line layer
///
/// The analysis core never fails; only reading inputs, loading configuration
/// and writing results do.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Plan parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// Helper to create invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Helper to create configuration error
    pub fn config(err: impl std::fmt::Display) -> Self {
        Self::Config(err.to_string())
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidInput(_) | Self::Parse(_) | Self::Json(_) => 2,
            Self::Config(_) => 3,
            Self::Io(_) => 4,
            Self::Other(_) => 1,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
