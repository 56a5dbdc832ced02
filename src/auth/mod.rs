// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Staff endpoints (issue, list, revoke) require an `X-API-Key` header that
//! matches one of the keys configured in `API_KEYS`. Download and link
//! inspection are anonymous: the link token is the credential.

pub mod error;
pub mod extractor;
pub mod keys;

pub use error::AuthError;
pub use extractor::{ApiKeyAuth, API_KEY_HEADER};
pub use keys::ApiKeys;
