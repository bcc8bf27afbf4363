use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// Malformed condition expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid condition expression at offset {position}: {message}")]
pub struct ParseError {
    /// Byte offset into the source string
    pub position: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}
