// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Statement records, one JSON file per statement.

use async_trait::async_trait;
use uuid::Uuid;

use super::traits::StatementStore;
use super::{FileStorage, StorageError, StorageResult};
use crate::delivery::StatementRecord;

/// File-backed statement store.
#[derive(Debug, Clone)]
pub struct StatementRepository {
    storage: FileStorage,
}

impl StatementRepository {
    pub fn new(storage: FileStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl StatementStore for StatementRepository {
    async fn exists(&self, statement_id: Uuid) -> StorageResult<bool> {
        Ok(self
            .storage
            .exists(self.storage.paths().statement(&statement_id.to_string())))
    }

    async fn resolve(&self, statement_id: Uuid) -> StorageResult<Option<StatementRecord>> {
        let path = self.storage.paths().statement(&statement_id.to_string());
        match self.storage.read_json::<StatementRecord>(&path) {
            Ok(record) => Ok(Some(record)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn save(&self, record: &StatementRecord) -> StorageResult<()> {
        let path = self.storage.paths().statement(&record.id.to_string());
        self.storage.write_json(&path, record)
    }
}
