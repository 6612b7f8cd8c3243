//! Request-scoped entries inside the shared working storage directory.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Reduce a caller-declared file name to a single safe path component.
///
/// Both `/` and `\` are treated as separators and only the final component
/// is kept. Surrounding whitespace is trimmed.
///
/// # Errors
///
/// Returns [`StorageError::InvalidName`] when nothing usable remains or the
/// name contains a NUL byte.
pub fn sanitize_file_name(declared: &str) -> StorageResult<String> {
    let last = declared
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if last.contains('\0') {
        return Err(StorageError::invalid_name("nul_byte", declared));
    }
    match last {
        "" => Err(StorageError::invalid_name("empty", declared)),
        "." | ".." => Err(StorageError::invalid_name("relative_component", declared)),
        name => Ok(name.to_string()),
    }
}

/// File written into working storage on behalf of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    /// Sanitised name the caller declared.
    pub name: String,
    /// Absolute or root-relative location of the entry.
    pub path: PathBuf,
}

/// Handle on the working storage directory.
///
/// Entries are named `<token>_<name>` with a fresh random token per entry, so
/// concurrent requests declaring the same name never share a file.
#[derive(Debug, Clone)]
pub struct WorkingStorage {
    root: PathBuf,
}

impl WorkingStorage {
    /// Wrap an existing directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory backing the namespace.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the backing directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn ensure_root(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::io("ensure_root", &self.root, source))
    }

    /// Write `bytes` under a request-scoped name derived from `declared`.
    ///
    /// # Errors
    ///
    /// Returns an error for unusable names or when the write fails.
    pub async fn stage(&self, declared: &str, bytes: &[u8]) -> StorageResult<StagedEntry> {
        let name = sanitize_file_name(declared)?;
        let path = self.root.join(scoped_name(&name));
        fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::io("stage.write", &path, source))?;
        debug!(path = %path.display(), bytes = bytes.len(), "staged working entry");
        Ok(StagedEntry { name, path })
    }

    /// Read a previously staged entry back.
    ///
    /// The janitor may have removed the entry already; that surfaces as an
    /// IO error like any other.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be read.
    pub async fn read(&self, entry: &StagedEntry) -> StorageResult<Vec<u8>> {
        fs::read(&entry.path)
            .await
            .map_err(|source| StorageError::io("read", &entry.path, source))
    }

    /// Delete an entry. A missing entry counts as removed.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than the entry being absent.
    pub async fn remove(&self, entry: &StagedEntry) -> StorageResult<()> {
        match fs::remove_file(&entry.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %entry.path.display(), "working entry already removed");
                Ok(())
            }
            Err(source) => Err(StorageError::io("remove", &entry.path, source)),
        }
    }
}

fn scoped_name(name: &str) -> String {
    format!("{}_{name}", Uuid::new_v4().simple())
}
