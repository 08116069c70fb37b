//! Token persistence for the Nimbus Cloud SDK.
//!
//! [`CloudManager`](crate::CloudManager) resolves its API token through the
//! [`TokenStorage`] trait so integrators can keep the token wherever suits
//! their deployment: a file, a database row, an environment-backed store.
//! Two ready-made implementations ship with the crate —
//! [`InMemoryTokenStorage`] for tests and short-lived processes, and
//! [`FileTokenStorage`] for a plain token file on disk.
//!
//! Storage never validates the token format; the manager validates before
//! and after every storage interaction.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Storage errors
#[derive(Debug)]
pub enum StorageError {
    /// IO error
    Io(io::Error),
    /// Path error
    Path(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "IO error: {}", err),
            StorageError::Path(msg) => write!(f, "path error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

/// Persistence capability for the Nimbus Cloud API token.
///
/// Implementations only store and retrieve; format validation is the
/// manager's job. `name()` identifies the implementation in diagnostics,
/// so a "no token available" failure names the storage that was queried.
pub trait TokenStorage: Send + Sync {
    /// Return the persisted token, or `None` when nothing has been stored.
    fn get_token(&self) -> Result<Option<String>, StorageError>;

    /// Persist the given token, replacing any previous value.
    fn set_token(&self, token: &str) -> Result<(), StorageError>;

    /// Implementation name used in diagnostics.
    fn name(&self) -> &str;
}

impl<T: TokenStorage + ?Sized> TokenStorage for Arc<T> {
    fn get_token(&self) -> Result<Option<String>, StorageError> {
        (**self).get_token()
    }

    fn set_token(&self, token: &str) -> Result<(), StorageError> {
        (**self).set_token(token)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Process-local token storage.
///
/// The token lives behind an `RwLock` and does not survive the process.
#[derive(Debug, Default)]
pub struct InMemoryTokenStorage {
    token: RwLock<Option<String>>,
}

impl InMemoryTokenStorage {
    /// Create an empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory storage pre-seeded with a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStorage for InMemoryTokenStorage {
    fn get_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.token.read().expect("token lock poisoned").clone())
    }

    fn set_token(&self, token: &str) -> Result<(), StorageError> {
        *self.token.write().expect("token lock poisoned") = Some(token.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "InMemoryTokenStorage"
    }
}

/// Token storage backed by a single file on disk.
///
/// The file holds the bare token; surrounding whitespace is ignored on
/// read. A missing or empty file reads as "no token stored". Writes
/// create missing parent directories.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Create a file storage at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this storage reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn get_token(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn set_token(&self, token: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, token)?;
        tracing::debug!("token written to {}", self.path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "FileTokenStorage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_round_trip() {
        let storage = InMemoryTokenStorage::new();
        assert_eq!(storage.get_token().unwrap(), None);

        storage.set_token("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(
            storage.get_token().unwrap(),
            Some("0123456789abcdef0123456789abcdef".to_string())
        );
    }

    #[test]
    fn test_in_memory_seeded() {
        let storage = InMemoryTokenStorage::with_token("aaaa");
        assert_eq!(storage.get_token().unwrap(), Some("aaaa".to_string()));
    }

    #[test]
    fn test_file_storage_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("token"));
        assert_eq!(storage.get_token().unwrap(), None);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("token"));

        storage.set_token("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(
            storage.get_token().unwrap(),
            Some("0123456789abcdef0123456789abcdef".to_string())
        );

        // overwrite replaces the previous value
        storage.set_token("fedcba9876543210fedcba9876543210").unwrap();
        assert_eq!(
            storage.get_token().unwrap(),
            Some("fedcba9876543210fedcba9876543210".to_string())
        );
    }

    #[test]
    fn test_file_storage_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("nested/deeper/token"));

        storage.set_token("0123456789abcdef0123456789abcdef").unwrap();
        assert!(storage.path().exists());
    }

    #[test]
    fn test_file_storage_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "  0123456789abcdef0123456789abcdef\n").unwrap();

        let storage = FileTokenStorage::new(&path);
        assert_eq!(
            storage.get_token().unwrap(),
            Some("0123456789abcdef0123456789abcdef".to_string())
        );
    }

    #[test]
    fn test_file_storage_blank_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "\n  \n").unwrap();

        let storage = FileTokenStorage::new(&path);
        assert_eq!(storage.get_token().unwrap(), None);
    }

    #[test]
    fn test_arc_delegation() {
        let storage = Arc::new(InMemoryTokenStorage::new());
        storage.set_token("abcd").unwrap();
        assert_eq!(storage.get_token().unwrap(), Some("abcd".to_string()));
        assert_eq!(TokenStorage::name(&storage), "InMemoryTokenStorage");
    }
}
