//! Candidate file resolution over an injectable dataset store.
//!
//! [`resolve_candidate`] walks a release's ordered candidate list and returns
//! the first file the [`DatasetStore`] reports as present. [`fetch_source`]
//! then reads it and records a SHA-256 content digest for traceability.

pub mod fs;
pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AuditError, Result};
use crate::loader::LoadError;
use crate::versions::{DatasetVersion, FileFormat};

pub use fs::DirStore;
pub use memory::MemoryStore;

/// Read-only access to the files a release may be stored in.
pub trait DatasetStore {
    /// Whether `file_name` is present.
    fn exists(&self, file_name: &str) -> bool;

    /// Read the full contents of `file_name`.
    fn read(&self, file_name: &str) -> std::io::Result<Vec<u8>>;

    /// Short description used in log lines.
    fn describe(&self) -> String;
}

/// The candidate chosen for a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub version: DatasetVersion,
    pub file_name: String,
    pub format: FileFormat,
}

impl fmt::Display for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.file_name, self.format)
    }
}

/// A resolved candidate plus its bytes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub resolved: ResolvedSource,
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: String,
}

/// Pick the first existing candidate for `version`.
pub fn resolve_candidate(store: &dyn DatasetStore, version: DatasetVersion) -> Result<ResolvedSource> {
    let descriptor = version.descriptor();
    for candidate in descriptor.candidates {
        if store.exists(candidate.file_name) {
            tracing::debug!(
                version = %version,
                file = candidate.file_name,
                "candidate present"
            );
            return Ok(ResolvedSource {
                version,
                file_name: candidate.file_name.to_string(),
                format: candidate.format,
            });
        }
        tracing::trace!(version = %version, file = candidate.file_name, "candidate absent");
    }

    Err(AuditError::DatasetUnavailable {
        version,
        tried: descriptor
            .candidates
            .iter()
            .map(|c| c.file_name.to_string())
            .collect(),
    })
}

/// Read a resolved candidate from the store.
pub fn fetch_source(store: &dyn DatasetStore, resolved: ResolvedSource) -> Result<SourceFile> {
    let bytes = store
        .read(&resolved.file_name)
        .map_err(|e| AuditError::Load {
            version: resolved.version,
            file_name: resolved.file_name.clone(),
            source: LoadError::Io(e),
        })?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    Ok(SourceFile {
        resolved,
        bytes,
        sha256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_first_present_candidate() {
        let store = MemoryStore::new()
            .with_file("NAVCO 1.2 Updated.csv", b"A\n1\n".to_vec())
            .with_file("NAVCO 1.2 Updated.xlsx", b"not really xlsx".to_vec());

        let resolved = resolve_candidate(&store, DatasetVersion::V1_2).unwrap();
        assert_eq!(resolved.file_name, "NAVCO 1.2 Updated.xlsx");
        assert_eq!(resolved.format, FileFormat::Xlsx);
    }

    #[test]
    fn falls_back_to_later_candidate() {
        let store = MemoryStore::new().with_file("NAVCO 1.1.csv", b"A\n".to_vec());
        let resolved = resolve_candidate(&store, DatasetVersion::V1_1).unwrap();
        assert_eq!(resolved.file_name, "NAVCO 1.1.csv");
        assert_eq!(resolved.format, FileFormat::Delimited);
    }

    #[test]
    fn missing_everywhere_is_unavailable() {
        let store = MemoryStore::new();
        let err = resolve_candidate(&store, DatasetVersion::V2_1).unwrap_err();
        match err {
            AuditError::DatasetUnavailable { version, tried } => {
                assert_eq!(version, DatasetVersion::V2_1);
                assert_eq!(tried.len(), 3);
                assert_eq!(tried[0], "NAVCO2-1_ForPublication.xls");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fetch_records_digest() {
        let store = MemoryStore::new().with_file("NAVCO 1.3 List.csv", b"hello world".to_vec());
        let resolved = resolve_candidate(&store, DatasetVersion::V1_3).unwrap();
        let source = fetch_source(&store, resolved).unwrap();
        assert_eq!(
            source.sha256,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(source.bytes, b"hello world");
    }
}
