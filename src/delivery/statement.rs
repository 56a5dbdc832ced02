// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Statement records: the protected files links point at.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Declared kind of a statement file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Csv,
    Excel,
    #[serde(other)]
    Other,
}

impl FileKind {
    /// MIME type served for this kind.
    pub fn content_type(&self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Csv => "text/csv",
            FileKind::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            FileKind::Other => "application/octet-stream",
        }
    }

    /// Infer the kind from a file name's extension.
    pub fn from_file_name(file_name: &str) -> Self {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => FileKind::Pdf,
            "csv" => FileKind::Csv,
            "xlsx" | "xls" => FileKind::Excel,
            _ => FileKind::Other,
        }
    }
}

/// A stored, encrypted statement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StatementRecord {
    /// Unique statement identifier.
    pub id: Uuid,
    /// Customer account the statement belongs to.
    pub account_number: String,
    /// Declared file name served on download.
    pub file_name: String,
    pub file_kind: FileKind,
    /// Plaintext size in bytes.
    pub file_size_bytes: u64,
    /// Blob reference of the ciphertext.
    pub storage_ref: String,
    /// Key id the ciphertext was sealed under.
    pub key_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
}
