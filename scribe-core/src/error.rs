use thiserror::Error;

use crate::llm::TransformationError;

pub type Result<T> = std::result::Result<T, ScribeError>;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session note {0} not found")]
    NotFound(i64),

    #[error("Session note {0} already has a generated note")]
    AlreadyGenerated(i64),

    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Error generating note: {source}")]
    GenerationFailed {
        note_id: i64,
        #[source]
        source: TransformationError,
    },
}
