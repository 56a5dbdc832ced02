// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the on-disk storage layout.

use std::path::{Path, PathBuf};

/// Base directory for all persistent storage.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities for the data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Link Database ==========

    /// Path to the redb database holding download links.
    pub fn links_db(&self) -> PathBuf {
        self.root.join("links.redb")
    }

    // ========== Statement Paths ==========

    /// Directory containing all statement records.
    pub fn statements_dir(&self) -> PathBuf {
        self.root.join("statements")
    }

    /// Path to a specific statement record.
    pub fn statement(&self, statement_id: &str) -> PathBuf {
        self.statements_dir().join(format!("{statement_id}.json"))
    }

    // ========== Blob Paths ==========

    /// Directory containing encrypted statement files.
    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    /// Path to a specific blob, by the relative reference returned on write.
    pub fn blob(&self, blob_ref: &str) -> PathBuf {
        self.blobs_dir().join(blob_ref)
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to the events file for a specific date (JSONL).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}
