use thiserror::Error;
use wiring_graph::GraphError;

pub type Result<T> = std::result::Result<T, ValidateError>;

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("Invalid validation options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
