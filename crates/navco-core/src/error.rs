//! Audit-level error taxonomy.
//!
//! Only [`AuditError::InvalidConfig`], [`AuditError::UnknownVersion`] and
//! I/O failures on the caller's own artifacts are fatal. Everything that goes
//! wrong while handling a single dataset release is converted into a skipped
//! or indeterminate version report by the audit pipeline.

use crate::loader::LoadError;
use crate::versions::DatasetVersion;

/// NAVCO audit errors.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("dataset {version} unavailable: none of [{}] found", tried.join(", "))]
    DatasetUnavailable {
        version: DatasetVersion,
        tried: Vec<String>,
    },

    #[error("failed to load {file_name} for dataset {version}: {source}")]
    Load {
        version: DatasetVersion,
        file_name: String,
        #[source]
        source: LoadError,
    },

    #[error("dataset {version} is missing identifying column(s): {}", columns.join(", "))]
    SchemaMismatch {
        version: DatasetVersion,
        columns: Vec<String>,
    },

    #[error("unknown dataset version: {0}")]
    UnknownVersion(String),

    #[error("invalid audit config: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
