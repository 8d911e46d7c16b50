//! Database error type and conversion from `sqlx::Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("database error: {0}")]
    Other(String),
}

impl DbError {
    pub fn not_found(context: impl Into<String>) -> Self {
        DbError::NotFound(context.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}

pub type DbResult<T> = std::result::Result<T, DbError>;

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound("no matching row".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::ConstraintViolation(db_err.to_string())
            }
            other => DbError::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }
}
