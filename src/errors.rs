use sea_orm::error::DbErr;
use serde::Serialize;
use strum::Display;

use crate::models::LineKind;

/// Coarse classification of a [`ServiceError`], for callers that branch on the
/// kind of failure rather than on its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Database,
    Validation,
    NotFound,
    DuplicateConflict,
    Consistency,
    Conflict,
    Configuration,
    Internal,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A merge-mode fill-from found every source line already present on the target.
    #[error("All {skipped} {kind} already present on variant {target_variant_id}")]
    DuplicateConflict {
        kind: LineKind,
        target_variant_id: i32,
        skipped: u64,
    },

    /// A cached total diverged from its recomputed value outside of a write.
    #[error("Consistency error on {entity} {id}: cached {cached}, recomputed {recomputed}")]
    ConsistencyError {
        entity: &'static str,
        id: i32,
        cached: String,
        recomputed: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),
}

/// Bootstrap code (config, connection, migrations) reports through the same type.
pub type AppError = ServiceError;

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
        ServiceError::DatabaseError(error.into_db_err())
    }

    pub fn not_found(entity: &str, id: i32) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::DatabaseError(_) => ErrorKind::Database,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::ValidationError(_) => ErrorKind::Validation,
            ServiceError::DuplicateConflict { .. } => ErrorKind::DuplicateConflict,
            ServiceError::ConsistencyError { .. } => ErrorKind::Consistency,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::ConfigurationError(_) => ErrorKind::Configuration,
            ServiceError::MigrationError(_) => ErrorKind::Internal,
        }
    }

    /// Caller-facing message. Internal errors return generic text so driver
    /// details do not leak into user output.
    pub fn response_message(&self) -> String {
        match self.kind() {
            ErrorKind::Database | ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}
