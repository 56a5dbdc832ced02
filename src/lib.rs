// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Statement Delivery - Secure Download Link Service
//!
//! Delivers encrypted bank statements through expiring, access-limited
//! download links. Every issuance, download and revocation is recorded in
//! an append-only audit trail.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Staff API key authentication
//! - `delivery` - Cipher, link lifecycle, access coordination and audit
//! - `storage` - redb link database and file-backed statements, blobs and audit logs

pub mod api;
pub mod auth;
pub mod config;
pub mod delivery;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
