use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A lazily computed property was forced while it was being computed
    #[error("Re-entrant evaluation of {0}")]
    Reentrant(String),
}
