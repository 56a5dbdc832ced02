// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Collaborator implementations behind the delivery core. Statement
//! payloads are encrypted by the core before they get here; this layer
//! only does plain file and database I/O.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   links.redb                  # links, token index, per-statement index
//!   statements/
//!     {statement_id}.json       # key id, blob ref, declared file
//!   blobs/
//!     {uuid}_{name}             # IV-prefixed ciphertext
//!   audit/
//!     {date}/events.jsonl       # daily audit logs
//! ```

pub mod audit;
pub mod blobs;
pub mod fs;
pub mod link_database;
pub mod memory;
pub mod paths;
pub mod statements;
pub mod traits;

use std::sync::Arc;

pub use audit::AuditLog;
pub use blobs::BlobRepository;
pub use fs::{FileStorage, StorageError, StorageResult};
pub use link_database::LinkDatabase;
pub use memory::{MemoryAuditStore, MemoryBlobStore, MemoryLinkStore, MemoryStatementStore};
pub use paths::StoragePaths;
pub use statements::StatementRepository;
pub use traits::{AuditStore, BlobStore, LinkStore, StatementStore};

use crate::delivery::Collaborators;

/// Initialize the data directory and open every on-disk collaborator.
///
/// Returns the initialized [`FileStorage`] (for health probes) alongside
/// the collaborators.
pub fn open(paths: StoragePaths) -> StorageResult<(FileStorage, Collaborators)> {
    let mut storage = FileStorage::new(paths);
    storage.initialize()?;

    let links = LinkDatabase::open(&storage.paths().links_db())?;

    let collaborators = Collaborators {
        links: Arc::new(links),
        statements: Arc::new(StatementRepository::new(storage.clone())),
        blobs: Arc::new(BlobRepository::new(storage.clone())),
        audit: Arc::new(AuditLog::new(storage.clone())),
    };
    Ok((storage, collaborators))
}
