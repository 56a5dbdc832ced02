// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Collaborator contracts consumed by the delivery core.
//!
//! The core only ever talks to persistence through these traits, which
//! keeps it storage-agnostic. The file and redb implementations in this
//! module tree are the production collaborators.

use async_trait::async_trait;
use uuid::Uuid;

use crate::delivery::{AuditEvent, Link, StatementRecord};

use super::StorageResult;

/// Durable store for download links.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Look up a link by its token.
    async fn get_by_token(&self, token: &str) -> StorageResult<Option<Link>>;

    /// Look up a link by its id.
    async fn get(&self, link_id: Uuid) -> StorageResult<Option<Link>>;

    /// Insert or replace a link (keyed by id, indexed by token and target).
    async fn save(&self, link: &Link) -> StorageResult<()>;

    /// All links issued for a statement, oldest first.
    async fn list_by_statement(&self, statement_id: Uuid) -> StorageResult<Vec<Link>>;
}

/// Store of protected statement records (the link targets).
#[async_trait]
pub trait StatementStore: Send + Sync {
    async fn exists(&self, statement_id: Uuid) -> StorageResult<bool>;

    /// Resolve a statement to its key id, blob reference and declared file.
    async fn resolve(&self, statement_id: Uuid) -> StorageResult<Option<StatementRecord>>;

    async fn save(&self, record: &StatementRecord) -> StorageResult<()>;
}

/// Opaque storage for encrypted file bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, blob_ref: &str) -> StorageResult<Vec<u8>>;

    /// Store bytes under a fresh reference derived from `name`.
    async fn write(&self, data: &[u8], name: &str) -> StorageResult<String>;

    /// Remove a blob. Removing a missing blob is not an error.
    async fn delete(&self, blob_ref: &str) -> StorageResult<()>;
}

/// Append-only sink for audit events.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, event: &AuditEvent) -> StorageResult<()>;
}
