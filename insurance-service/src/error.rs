use database_layer::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsuranceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    #[error("Conflicting records: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl InsuranceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Classify a driver error; constraint failures become [`InsuranceError::Conflict`]
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match DatabaseError::from_sqlx(error) {
            DatabaseError::ConstraintViolation { constraint, .. } => Self::Conflict(constraint),
            other => Self::Database(other),
        }
    }
}

pub type InsuranceResult<T> = Result<T, InsuranceError>;
