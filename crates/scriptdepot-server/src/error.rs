//! Error taxonomy for depot operations.

use scriptdepot_auth::AuthError;
use scriptdepot_core::db::DatabaseError;

/// Errors surfaced by tool, snapshot and restore operations.
#[derive(Debug, thiserror::Error)]
pub enum DepotError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    NotFound(String),

    #[error("No backup found for project '{0}'")]
    NoBackupFound(String),

    #[error("Backup file not found: {0}")]
    BackupFileMissing(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid backup artifact: {0}")]
    InvalidArtifact(String),

    #[error("Storage error: {0}")]
    Store(DatabaseError),
}

impl From<DatabaseError> for DepotError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            other => Self::Store(other),
        }
    }
}

impl DepotError {
    /// Stable wire code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Auth(e) => e.code(),
            Self::NotFound(_) => "NOT_FOUND",
            Self::NoBackupFound(_) => "NO_BACKUP_FOUND",
            Self::BackupFileMissing(_) => "BACKUP_FILE_MISSING",
            Self::Io(_) => "IO_FAILURE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidArtifact(_) => "INVALID_ARTIFACT",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// True for failures on our side rather than the caller's.
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Store(_))
    }
}

pub type DepotResult<T> = Result<T, DepotError>;
