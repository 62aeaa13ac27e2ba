use thiserror::Error;

/// Errors surfaced by the task store and its collaborators.
///
/// Unknown ids are not errors; operations report them as a no-op instead.
#[derive(Debug, Error)]
pub enum TodoError {
    /// A required field was empty or out of range. Nothing was changed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Persisted or imported data did not have the expected shape.
    #[error("invalid data format: {0}")]
    Format(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl TodoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TodoError::Validation(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        TodoError::Format(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TodoError>;
