use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Constraint violation: {constraint}")]
    ConstraintViolation { constraint: String, message: String },

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl DatabaseError {
    /// Classify a driver error, lifting constraint failures (unique, foreign key,
    /// check, exclusion) into [`DatabaseError::ConstraintViolation`].
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &error {
            if let Some(constraint) = db_err.constraint() {
                return Self::ConstraintViolation {
                    constraint: constraint.to_string(),
                    message: db_err.message().to_string(),
                };
            }
        }
        Self::SqlxError(error)
    }

    /// Whether the failure stems from a violated table constraint
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
