// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Link database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `links`: link_id → serialized link record (JSON bytes)
//! - `link_tokens`: token → link_id
//! - `statement_links`: composite key (statement_id|link_id) → ()

use std::path::Path;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::traits::LinkStore;
use super::{StorageError, StorageResult};
use crate::delivery::link::LinkRecord;
use crate::delivery::Link;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: link_id → serialized link record.
const LINKS: TableDefinition<&str, &[u8]> = TableDefinition::new("links");

/// Index: token → link_id.
const LINK_TOKENS: TableDefinition<&str, &str> = TableDefinition::new("link_tokens");

/// Index: `statement_id|link_id` → (). Prefix-scanned per statement.
const STATEMENT_LINKS: TableDefinition<&str, ()> = TableDefinition::new("statement_links");

fn statement_key(statement_id: Uuid, link_id: Uuid) -> String {
    format!("{statement_id}|{link_id}")
}

/// `[start, end)` covering every key of one statement. `}` sorts right after `|`.
fn statement_range(statement_id: Uuid) -> (String, String) {
    (format!("{statement_id}|"), format!("{statement_id}}}"))
}

fn decode(bytes: &[u8]) -> StorageResult<Link> {
    let record: LinkRecord = serde_json::from_slice(bytes)?;
    Ok(Link::from_record(record))
}

/// Embedded ACID link database.
pub struct LinkDatabase {
    db: Database,
}

impl LinkDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LINKS)?;
            let _ = write_txn.open_table(LINK_TOKENS)?;
            let _ = write_txn.open_table(STATEMENT_LINKS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn load(&self, link_id: &str) -> StorageResult<Option<Link>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LINKS)?;
        match table.get(link_id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LinkStore for LinkDatabase {
    async fn get_by_token(&self, token: &str) -> StorageResult<Option<Link>> {
        let link_id = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(LINK_TOKENS)?;
            match table.get(token)? {
                Some(value) => value.value().to_string(),
                None => return Ok(None),
            }
        };
        self.load(&link_id)
    }

    async fn get(&self, link_id: Uuid) -> StorageResult<Option<Link>> {
        self.load(&link_id.to_string())
    }

    async fn save(&self, link: &Link) -> StorageResult<()> {
        let id = link.id().to_string();
        let json = serde_json::to_vec(&link.to_record())?;

        let write_txn = self.db.begin_write()?;
        {
            let mut tokens = write_txn.open_table(LINK_TOKENS)?;
            let owner = tokens.get(link.token())?.map(|v| v.value().to_string());
            if let Some(owner) = owner {
                if owner != id {
                    return Err(StorageError::IntegrityViolation(format!(
                        "token already bound to link {owner}"
                    )));
                }
            }
            tokens.insert(link.token(), id.as_str())?;

            let mut links = write_txn.open_table(LINKS)?;
            links.insert(id.as_str(), json.as_slice())?;

            let mut by_statement = write_txn.open_table(STATEMENT_LINKS)?;
            let key = statement_key(link.statement_id(), link.id());
            by_statement.insert(key.as_str(), ())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    async fn list_by_statement(&self, statement_id: Uuid) -> StorageResult<Vec<Link>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(STATEMENT_LINKS)?;
        let links = read_txn.open_table(LINKS)?;

        let (start, end) = statement_range(statement_id);
        let mut results = Vec::new();
        for entry in index.range(start.as_str()..end.as_str())? {
            let (key, _) = entry?;
            let Some((_, link_id)) = key.value().split_once('|') else {
                continue;
            };
            if let Some(value) = links.get(link_id)? {
                results.push(decode(value.value())?);
            }
        }

        results.sort_by_key(|link| link.created_at());
        Ok(results)
    }
}
