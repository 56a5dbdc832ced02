// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Filesystem primitives shared by the file-backed repositories.
//!
//! Statement records, encrypted blobs and audit logs all live under the
//! data directory. Statement payloads are already encrypted by the
//! [`FileCipher`](crate::delivery::FileCipher) before they reach this layer,
//! so this module only deals with plain file I/O.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

/// Error type for storage collaborators.
///
/// The delivery core never interprets these; they surface as opaque
/// infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage not initialized")]
    NotInitialized,

    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// File storage rooted at the data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    paths: StoragePaths,
    initialized: bool,
}

impl FileStorage {
    /// Create a new FileStorage instance.
    ///
    /// Does NOT initialize the directory structure. Call `initialize()` first.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Check if storage is initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initialize the directory structure.
    ///
    /// Safe to call multiple times (idempotent).
    pub fn initialize(&mut self) -> StorageResult<()> {
        let dirs = [
            self.paths.statements_dir(),
            self.paths.blobs_dir(),
            self.paths.audit_dir(),
        ];

        for dir in dirs {
            fs::create_dir_all(&dir)?;
        }

        self.initialized = true;
        Ok(())
    }

    /// Verify the data directory with a write-read-delete probe.
    pub fn health_check(&self) -> StorageResult<()> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }

        let test_file = self.paths.root().join(".health_check");
        let test_data = b"health_check_data";

        fs::write(&test_file, test_data)?;
        let read_data = fs::read(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(StorageError::IntegrityViolation(
                "Health check data mismatch".to_string(),
            ));
        }

        Ok(())
    }

    fn ensure_initialized(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }

    // ========== Generic JSON Operations ==========

    /// Read a JSON file and deserialize it.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        self.ensure_initialized()?;

        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let value = serde_json::from_reader(reader)?;
        Ok(value)
    }

    /// Write a JSON file (atomic write via rename).
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        let temp_path = temp_sibling(path);
        {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Check if a file exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        File::open(path.as_ref()).is_ok()
    }

    /// Delete a file.
    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        self.ensure_initialized()?;
        fs::remove_file(path.as_ref())?;
        Ok(())
    }

    // ========== Raw File Operations ==========

    /// Write raw bytes to a file (atomic write via rename).
    pub fn write_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = temp_sibling(path);
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Read raw bytes from a file.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        self.ensure_initialized()?;

        let mut file = File::open(path.as_ref())?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Append raw bytes to a file, creating it (and its parents) if needed.
    pub fn append_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }
}

/// Unique temp path next to `path`, so concurrent writers never share one.
fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().expect("Failed to initialize test storage");
        (temp, storage)
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        id: String,
        value: i32,
    }

    #[test]
    fn initialize_creates_directories() {
        let (_temp, storage) = setup();

        assert!(storage.is_initialized());
        assert!(storage.paths().statements_dir().exists());
        assert!(storage.paths().blobs_dir().exists());
        assert!(storage.paths().audit_dir().exists());
    }

    #[test]
    fn write_and_read_json() {
        let (_temp, storage) = setup();
        let data = TestData {
            id: "test-1".to_string(),
            value: 42,
        };

        let path = storage.paths().statement("test-1");
        storage.write_json(&path, &data).unwrap();

        let read: TestData = storage.read_json(&path).unwrap();
        assert_eq!(read, data);
    }

    #[test]
    fn write_leaves_no_temp_files() {
        let (_temp, storage) = setup();
        let path = storage.paths().statement("only");
        storage
            .write_json(&path, &TestData {
                id: "only".to_string(),
                value: 1,
            })
            .unwrap();

        let entries: Vec<_> = fs::read_dir(storage.paths().statements_dir())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn write_read_and_append_raw() {
        let (_temp, storage) = setup();
        let path = storage.paths().blob("raw.bin");

        storage.write_raw(&path, b"\x00\x01\x02").unwrap();
        storage.append_raw(&path, b"\x03").unwrap();

        assert_eq!(storage.read_raw(&path).unwrap(), b"\x00\x01\x02\x03");
    }

    #[test]
    fn health_check_works() {
        let (_temp, storage) = setup();
        storage.health_check().expect("Health check should pass");
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let (_temp, storage) = setup();
        let result = storage.read_raw(storage.paths().blob("missing"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn uninitialized_storage_returns_error() {
        let storage = FileStorage::new(StoragePaths::new("/tmp/never-init"));

        let result = storage.read_json::<TestData>("/tmp/any.json");
        assert!(matches!(result, Err(StorageError::NotInitialized)));
    }
}
