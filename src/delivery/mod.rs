// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Statement Delivery Core
//!
//! Secure download links over encrypted statement files.
//!
//! ```text
//! issue ──▶ Link (fresh token) ─── later ───▶ download(token)
//!                                               │
//!                     LinkAccessCoordinator ◀───┘  per-token lock:
//!                       check ▶ record access ▶ save
//!                               │
//!            DeliveryService ◀──┘  blob read ▶ FileCipher::decrypt
//!                               │
//!                     AuditRecorder::record(Downloaded)
//! ```
//!
//! Persistence is reached only through the traits in
//! [`crate::storage::traits`].

pub mod audit;
pub mod cipher;
pub mod clock;
pub mod coordinator;
pub mod error;
pub mod link;
pub mod service;
pub mod statement;

pub use audit::{AuditAction, AuditEvent, AuditRecorder};
pub use cipher::{CipherError, CipherKey, DerivedKeys, FileCipher, KeyResolver, StaticKey};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::LinkAccessCoordinator;
pub use error::{DeliveryError, DeliveryResult};
pub use link::{Link, LinkStatus, LinkView};
pub use service::{Collaborators, DeliveryService, Download, IssueLink, NewStatement};
pub use statement::{FileKind, StatementRecord};
