// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory collaborators.
//!
//! Same semantics as the file and redb stores with no persistence. Used by
//! tests and for embedding the delivery core without a data directory.
//! Every call yields to the scheduler once, like a real storage round trip,
//! so concurrent interleavings actually happen under test.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::delivery::{AuditEvent, Link, StatementRecord};

use super::traits::{AuditStore, BlobStore, LinkStore, StatementStore};
use super::{StorageError, StorageResult};

fn poisoned() -> StorageError {
    StorageError::IntegrityViolation("in-memory store lock poisoned".to_string())
}

/// In-memory link store.
#[derive(Default)]
pub struct MemoryLinkStore {
    links: RwLock<HashMap<Uuid, Link>>,
    fail_saves: AtomicBool,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail (failure injection for tests).
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn get_by_token(&self, token: &str) -> StorageResult<Option<Link>> {
        tokio::task::yield_now().await;
        let links = self.links.read().map_err(|_| poisoned())?;
        Ok(links.values().find(|link| link.token() == token).cloned())
    }

    async fn get(&self, link_id: Uuid) -> StorageResult<Option<Link>> {
        tokio::task::yield_now().await;
        let links = self.links.read().map_err(|_| poisoned())?;
        Ok(links.get(&link_id).cloned())
    }

    async fn save(&self, link: &Link) -> StorageResult<()> {
        tokio::task::yield_now().await;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("injected save failure")));
        }
        let mut links = self.links.write().map_err(|_| poisoned())?;
        if let Some(owner) = links
            .values()
            .find(|other| other.token() == link.token() && other.id() != link.id())
        {
            return Err(StorageError::IntegrityViolation(format!(
                "token already bound to link {}",
                owner.id()
            )));
        }
        links.insert(link.id(), link.clone());
        Ok(())
    }

    async fn list_by_statement(&self, statement_id: Uuid) -> StorageResult<Vec<Link>> {
        tokio::task::yield_now().await;
        let links = self.links.read().map_err(|_| poisoned())?;
        let mut matching: Vec<Link> = links
            .values()
            .filter(|link| link.statement_id() == statement_id)
            .cloned()
            .collect();
        matching.sort_by_key(|link| link.created_at());
        Ok(matching)
    }
}

/// In-memory statement store.
#[derive(Default)]
pub struct MemoryStatementStore {
    records: RwLock<HashMap<Uuid, StatementRecord>>,
}

impl MemoryStatementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatementStore for MemoryStatementStore {
    async fn exists(&self, statement_id: Uuid) -> StorageResult<bool> {
        tokio::task::yield_now().await;
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.contains_key(&statement_id))
    }

    async fn resolve(&self, statement_id: Uuid) -> StorageResult<Option<StatementRecord>> {
        tokio::task::yield_now().await;
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(&statement_id).cloned())
    }

    async fn save(&self, record: &StatementRecord) -> StorageResult<()> {
        tokio::task::yield_now().await;
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.insert(record.id, record.clone());
        Ok(())
    }
}

/// In-memory blob store.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a blob in place (tamper simulation for tests).
    pub fn replace(&self, blob_ref: &str, data: Vec<u8>) -> StorageResult<()> {
        let mut blobs = self.blobs.write().map_err(|_| poisoned())?;
        blobs.insert(blob_ref.to_string(), data);
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, blob_ref: &str) -> StorageResult<Vec<u8>> {
        tokio::task::yield_now().await;
        let blobs = self.blobs.read().map_err(|_| poisoned())?;
        blobs
            .get(blob_ref)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("Blob {blob_ref}")))
    }

    async fn write(&self, data: &[u8], name: &str) -> StorageResult<String> {
        tokio::task::yield_now().await;
        let blob_ref = format!("{}_{name}", Uuid::new_v4().simple());
        let mut blobs = self.blobs.write().map_err(|_| poisoned())?;
        blobs.insert(blob_ref.clone(), data.to_vec());
        Ok(blob_ref)
    }

    async fn delete(&self, blob_ref: &str) -> StorageResult<()> {
        tokio::task::yield_now().await;
        let mut blobs = self.blobs.write().map_err(|_| poisoned())?;
        blobs.remove(blob_ref);
        Ok(())
    }
}

/// In-memory audit sink.
#[derive(Default)]
pub struct MemoryAuditStore {
    events: RwLock<Vec<AuditEvent>>,
    fail_appends: AtomicBool,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append` fail (failure injection for tests).
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all appended events, in append order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, event: &AuditEvent) -> StorageResult<()> {
        tokio::task::yield_now().await;
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("injected append failure")));
        }
        let mut events = self.events.write().map_err(|_| poisoned())?;
        events.push(event.clone());
        Ok(())
    }
}
