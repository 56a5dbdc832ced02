// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit log persistence.
//!
//! Events are appended to a daily JSONL file (`audit/{date}/events.jsonl`).
//! Appends go through a process-wide lock so lines never interleave.

use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::AuditStore;
use super::{FileStorage, StorageError, StorageResult};
use crate::delivery::audit::AuditEventRecord;
use crate::delivery::AuditEvent;

/// Repository for audit events.
#[derive(Debug)]
pub struct AuditLog {
    storage: FileStorage,
    append_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(storage: FileStorage) -> Self {
        Self {
            storage,
            append_lock: Mutex::new(()),
        }
    }

    /// Read audit events for a specific date (`YYYY-MM-DD`).
    ///
    /// A day with no events yields an empty list.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let path = self.storage.paths().audit_events_file(date);
        let content = match self.storage.read_raw(&path) {
            Ok(content) => content,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut events = Vec::new();
        for line in content.split(|b| *b == b'\n') {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let record: AuditEventRecord = serde_json::from_slice(line)?;
            events.push(AuditEvent::from_record(record));
        }
        Ok(events)
    }
}

#[async_trait]
impl AuditStore for AuditLog {
    async fn append(&self, event: &AuditEvent) -> StorageResult<()> {
        let date = event.timestamp().format("%Y-%m-%d").to_string();
        let path = self.storage.paths().audit_events_file(&date);

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let _guard = self
            .append_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.storage.append_raw(&path, &line)
    }
}
