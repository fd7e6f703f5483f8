use std::fs;
use std::path::{Path, PathBuf};

use super::DatasetStore;

/// Dataset store backed by a single directory on disk.
///
/// Candidate names are joined onto `root` verbatim; the NAVCO file names
/// contain spaces and are never treated as globs.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

impl DatasetStore for DirStore {
    fn exists(&self, file_name: &str) -> bool {
        self.path_of(file_name).is_file()
    }

    fn read(&self, file_name: &str) -> std::io::Result<Vec<u8>> {
        fs::read(self.path_of(file_name))
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_files_with_spaces_in_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("NAVCO 1.1.csv"), b"CAMPAIGN\nX\n").unwrap();

        let store = DirStore::new(dir.path());
        assert!(store.exists("NAVCO 1.1.csv"));
        assert!(!store.exists("NAVCO 1.1.dta"));
        assert_eq!(store.read("NAVCO 1.1.csv").unwrap(), b"CAMPAIGN\nX\n");
    }

    #[test]
    fn directory_is_not_a_dataset() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("NAVCO 1.1.dta")).unwrap();
        let store = DirStore::new(dir.path());
        assert!(!store.exists("NAVCO 1.1.dta"));
    }

    #[test]
    fn read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        let err = store.read("absent.csv").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
