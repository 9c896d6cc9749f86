use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoronaError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Linear algebra error: {0}")]
    LinAlg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("npy error: {0}")]
    Npy(String),
}

pub type CoronaResult<T> = Result<T, CoronaError>;
