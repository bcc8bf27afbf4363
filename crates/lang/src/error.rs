use thiserror::Error;

/// Result type for declaration loading
pub type Result<T> = std::result::Result<T, LangError>;

/// Errors raised while assembling a declaration set
#[derive(Error, Debug)]
pub enum LangError {
    /// Malformed JSON payload
    #[error("Declaration JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two declarations share one name
    #[error("Duplicate declaration: {0}")]
    DuplicateDeclaration(String),

    /// Declaration name is empty or not an identifier path
    #[error("Invalid declaration name: {0:?}")]
    InvalidName(String),
}
