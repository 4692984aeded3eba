//! Error types for plan description parsing

use thiserror::Error;

/// Errors raised while extracting structured fields from plan text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("{operator} plan text not recognized: {text}")]
    Unrecognized { operator: String, text: String },

    #[error("{operator} plan is missing field '{field}'")]
    MissingField { operator: String, field: String },

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),
}

impl ParseError {
    pub fn unrecognized(operator: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Unrecognized { operator: operator.into(), text: text.into() }
    }

    pub fn missing_field(operator: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField { operator: operator.into(), field: field.into() }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
