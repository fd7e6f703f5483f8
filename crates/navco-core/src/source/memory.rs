//! In-memory dataset store for tests and embedding.

use std::collections::BTreeMap;

use super::DatasetStore;

/// Dataset store backed by a `BTreeMap<file name, bytes>`.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file (builder pattern).
    pub fn with_file(mut self, file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(file_name, bytes);
        self
    }

    pub fn insert(&mut self, file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(file_name.into(), bytes.into());
    }
}

impl DatasetStore for MemoryStore {
    fn exists(&self, file_name: &str) -> bool {
        self.files.contains_key(file_name)
    }

    fn read(&self, file_name: &str) -> std::io::Result<Vec<u8>> {
        self.files.get(file_name).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{file_name} not in memory store"),
            )
        })
    }

    fn describe(&self) -> String {
        format!("memory:{} file(s)", self.files.len())
    }
}
