//! Error types shared by the feed pipeline crates

use thiserror::Error;

/// Errors raised while building or validating core types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid feed source ({source_name}): {message}")]
    InvalidSource {
        source_name: String,
        message: String,
    },
}

impl CoreError {
    pub fn parse(msg: impl Into<String>) -> Self {
        CoreError::Parse(msg.into())
    }

    pub fn invalid_source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::InvalidSource {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
