use thiserror::Error;
use wiring_model::ModelError;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Not a root component: {0}")]
    NotAComponent(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}
