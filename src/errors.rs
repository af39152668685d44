use sea_orm::error::DbErr;
use sea_orm::{RuntimeErr, SqlErr};
use serde::Serialize;

/// Failure classes surfaced by every ledger operation.
///
/// Operations either commit completely or fail with one of these; callers
/// decide whether to retry, report or abort.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[serde(skip)] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate: {0}")]
    DuplicateError(String),

    #[error("No capacity: {0}")]
    CapacityError(String),

    #[error("Dangling reference: {0}")]
    ReferenceError(String),

    #[error("Consistency violation: {0}")]
    ConsistencyError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Concurrent modification of {entity} {id}")]
    ConcurrentModification { entity: &'static str, id: i32 },

    /// The backend refused a write because another transaction holds or
    /// changed the rows (SQLite busy/locked, Postgres serialization failure
    /// or deadlock). The whole transaction can be replayed.
    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

/// Storage errors are classified so that a constraint caught by the database
/// (after a race slipped past a service pre-check) keeps its domain meaning.
impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        if is_write_conflict(&err) {
            return ServiceError::WriteConflict(err.to_string());
        }
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => ServiceError::DuplicateError(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                ServiceError::ReferenceError(detail)
            }
            _ => ServiceError::DatabaseError(err),
        }
    }
}

/// SQLite result codes for BUSY, LOCKED and their extended forms.
const SQLITE_CONFLICT_CODES: [&str; 6] = ["5", "6", "261", "262", "517", "773"];

/// Postgres SQLSTATEs for serialization failure and deadlock.
const POSTGRES_CONFLICT_CODES: [&str; 2] = ["40001", "40P01"];

fn is_write_conflict(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Exec(runtime) | DbErr::Query(runtime) | DbErr::Conn(runtime) => runtime,
        _ => return false,
    };
    let RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db_err)) = runtime else {
        return false;
    };
    let Some(code) = db_err.code() else {
        return false;
    };
    SQLITE_CONFLICT_CODES.contains(&code.as_ref()) || POSTGRES_CONFLICT_CODES.contains(&code.as_ref())
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::from(error.into_db_err())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::ValidationError(message.into())
    }

    /// Stable machine-readable code for external collaborators.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::ValidationError(_) => "validation_error",
            Self::DuplicateError(_) => "duplicate",
            Self::CapacityError(_) => "capacity_exhausted",
            Self::ReferenceError(_) => "dangling_reference",
            Self::ConsistencyError(_) => "consistency_violation",
            Self::NotFound(_) => "not_found",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::WriteConflict(_) => "write_conflict",
            Self::ConfigError(_) => "configuration_error",
            Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    /// Lost races are worth replaying as a fresh transaction; every other
    /// class fails the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification { .. } | Self::WriteConflict(_)
        )
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn custom_db_errors_stay_database_errors() {
        let err = ServiceError::db_error("connection reset");
        assert_matches!(err, ServiceError::DatabaseError(DbErr::Custom(_)));
        assert_eq!(err.code(), "database_error");
    }

    #[test]
    fn validation_errors_convert() {
        let errors = validator::ValidationErrors::new();
        let err: ServiceError = errors.into();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    #[test]
    fn codes_are_distinct_per_domain_class() {
        let codes = [
            ServiceError::validation("x").code(),
            ServiceError::DuplicateError("x".into()).code(),
            ServiceError::CapacityError("x".into()).code(),
            ServiceError::ReferenceError("x".into()).code(),
            ServiceError::ConsistencyError("x".into()).code(),
        ];
        let mut unique = codes.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn only_lost_races_are_retryable() {
        assert!(ServiceError::ConcurrentModification {
            entity: "enrollment",
            id: 1
        }
        .is_retryable());
        assert!(ServiceError::WriteConflict("database is locked".into()).is_retryable());
        assert!(!ServiceError::CapacityError("full".into()).is_retryable());
        assert!(!ServiceError::db_error("connection reset").is_retryable());
    }

    #[test]
    fn conflict_codes_cover_both_backends() {
        assert!(SQLITE_CONFLICT_CODES.contains(&"5"));
        assert!(SQLITE_CONFLICT_CODES.contains(&"517"));
        assert!(POSTGRES_CONFLICT_CODES.contains(&"40001"));
        assert!(!is_write_conflict(&DbErr::Custom("database is locked".into())));
    }
}
