use thiserror::Error;

use super::task::TaskId;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Validation(String),
}

impl TaskError {
    pub fn validation(message: impl Into<String>) -> Self { Self::Validation(message.into()) }
}
