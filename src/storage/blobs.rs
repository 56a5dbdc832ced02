// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted statement bytes under `blobs/`.
//!
//! References are flat file names (`{uuid}_{sanitized name}`) relative to
//! the blob directory. Anything that could escape it is rejected.

use async_trait::async_trait;
use uuid::Uuid;

use super::traits::BlobStore;
use super::{FileStorage, StorageError, StorageResult};

const MAX_NAME_LEN: usize = 100;

/// File-backed blob store.
#[derive(Debug, Clone)]
pub struct BlobRepository {
    storage: FileStorage,
}

impl BlobRepository {
    pub fn new(storage: FileStorage) -> Self {
        Self { storage }
    }

    fn checked_ref(blob_ref: &str) -> StorageResult<&str> {
        let valid = !blob_ref.is_empty()
            && !blob_ref.starts_with('.')
            && blob_ref
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'));
        if valid {
            Ok(blob_ref)
        } else {
            Err(StorageError::IntegrityViolation(format!(
                "invalid blob reference: {blob_ref}"
            )))
        }
    }
}

/// Reduce a declared file name to `[A-Za-z0-9._-]`, capped in length.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl BlobStore for BlobRepository {
    async fn read(&self, blob_ref: &str) -> StorageResult<Vec<u8>> {
        let blob_ref = Self::checked_ref(blob_ref)?;
        self.storage.read_raw(self.storage.paths().blob(blob_ref))
    }

    async fn write(&self, data: &[u8], name: &str) -> StorageResult<String> {
        let blob_ref = format!("{}_{}", Uuid::new_v4().simple(), sanitize(name));
        self.storage
            .write_raw(self.storage.paths().blob(&blob_ref), data)?;
        Ok(blob_ref)
    }

    async fn delete(&self, blob_ref: &str) -> StorageResult<()> {
        let blob_ref = Self::checked_ref(blob_ref)?;
        match self.storage.delete(self.storage.paths().blob(blob_ref)) {
            Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn setup() -> (TempDir, BlobRepository) {
        let temp = TempDir::new().unwrap();
        let mut storage = FileStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, BlobRepository::new(storage))
    }

    #[tokio::test]
    async fn write_read_delete() {
        let (_temp, blobs) = setup();

        let blob_ref = blobs.write(b"ciphertext", "march.pdf").await.unwrap();
        assert!(blob_ref.ends_with("_march.pdf"));
        assert_eq!(blobs.read(&blob_ref).await.unwrap(), b"ciphertext");

        blobs.delete(&blob_ref).await.unwrap();
        blobs.delete(&blob_ref).await.unwrap();
        assert!(matches!(blobs.read(&blob_ref).await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn names_are_sanitized() {
        let (_temp, blobs) = setup();
        let blob_ref = blobs.write(b"x", "../../etc/pass wd").await.unwrap();
        assert!(blob_ref.ends_with("_.._.._etc_pass_wd"));
        assert!(blobs.read(&blob_ref).await.is_ok());
    }

    #[tokio::test]
    async fn escaping_refs_are_rejected() {
        let (_temp, blobs) = setup();
        for bad in ["../links.redb", "a/b", "", ".hidden"] {
            assert!(matches!(
                blobs.read(bad).await,
                Err(StorageError::IntegrityViolation(_))
            ));
        }
    }

    #[test]
    fn sanitize_edge_cases() {
        assert_eq!(sanitize(""), "file");
        assert_eq!(sanitize("relevé.pdf"), "relev_.pdf");
        assert_eq!(sanitize(&"a".repeat(300)).len(), MAX_NAME_LEN);
    }
}
