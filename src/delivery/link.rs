// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Download links and their state machine.
//!
//! ## States
//!
//! ```text
//! Active ──access──▶ Used ──budget exhausted──▶ Expired
//!   │                 │
//!   ├── wall clock past expires_at ──────────▶ Expired
//!   └── revoke (from any state) ─────────────▶ Revoked
//! ```
//!
//! `Expired` and `Revoked` are terminal. Expiry is lazy: the stored status
//! may still read `Active`/`Used` after `expires_at` has passed, so every
//! access re-checks the wall clock before trusting it.
//!
//! Domain code creates links only through [`Link::issue`]. The storage
//! layer rehydrates them from [`LinkRecord`] without re-validating.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::cipher::CipherError;
use super::error::{DeliveryError, DeliveryResult};

/// Random bytes behind every token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Encoded token length: unpadded URL-safe base64 of 32 bytes.
pub const TOKEN_LEN: usize = 43;

/// Lifecycle status of a download link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// Issued, never accessed.
    Active,
    /// Accessed at least once, budget remaining.
    Used,
    /// Past its deadline or out of accesses.
    Expired,
    /// Manually disabled.
    Revoked,
}

impl LinkStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkStatus::Expired | LinkStatus::Revoked)
    }
}

/// Generate a fresh link token: 32 CSPRNG bytes, URL-safe base64, no padding.
pub fn generate_token() -> Result<String, CipherError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| CipherError::Random)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Cheap shape check so obviously malformed tokens never reach storage.
pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// A token-bearing permission to download one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    id: Uuid,
    statement_id: Uuid,
    token: String,
    status: LinkStatus,
    created_at: DateTime<Utc>,
    created_by: String,
    expires_at: DateTime<Utc>,
    first_accessed_at: Option<DateTime<Utc>>,
    access_count: u32,
    max_access_count: Option<u32>,
}

impl Link {
    /// Issue a new link for `statement_id`, valid for `expiration_minutes`.
    ///
    /// # Errors
    /// `Validation` if the lifetime is not positive, the creator is blank,
    /// or the access budget is zero.
    pub fn issue(
        statement_id: Uuid,
        expiration_minutes: i64,
        created_by: &str,
        max_access_count: Option<u32>,
        now: DateTime<Utc>,
    ) -> DeliveryResult<Self> {
        if expiration_minutes <= 0 {
            return Err(DeliveryError::Validation(
                "expiration minutes must be positive".to_string(),
            ));
        }
        if created_by.trim().is_empty() {
            return Err(DeliveryError::Validation(
                "created by cannot be empty".to_string(),
            ));
        }
        if max_access_count == Some(0) {
            return Err(DeliveryError::Validation(
                "max access count must be at least 1".to_string(),
            ));
        }

        let expires_at = Duration::try_minutes(expiration_minutes)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                DeliveryError::Validation("expiration minutes out of range".to_string())
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            statement_id,
            token: generate_token()?,
            status: LinkStatus::Active,
            created_at: now,
            created_by: created_by.trim().to_string(),
            expires_at,
            first_accessed_at: None,
            access_count: 0,
            max_access_count,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn statement_id(&self) -> Uuid {
        self.statement_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Stored status. May be stale with respect to the wall clock.
    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn first_accessed_at(&self) -> Option<DateTime<Utc>> {
        self.first_accessed_at
    }

    pub fn access_count(&self) -> u32 {
        self.access_count
    }

    pub fn max_access_count(&self) -> Option<u32> {
        self.max_access_count
    }

    /// Expired by status or by wall clock.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == LinkStatus::Expired || now > self.expires_at
    }

    /// Read-only precondition check for an access at `now`.
    ///
    /// A `LinkExpired` result on a link whose stored status is not yet
    /// `Expired` means the caller should persist [`Link::mark_expired`].
    pub fn check_access(&self, now: DateTime<Utc>) -> DeliveryResult<()> {
        if self.status == LinkStatus::Revoked {
            return Err(DeliveryError::LinkRevoked);
        }
        if self.is_expired_at(now) {
            return Err(DeliveryError::LinkExpired);
        }
        if let Some(max) = self.max_access_count {
            if self.access_count >= max {
                return Err(DeliveryError::AccessLimitReached);
            }
        }
        Ok(())
    }

    /// Count one successful access.
    ///
    /// Re-runs [`Link::check_access`] first. Exhausting the budget moves the
    /// link straight to `Expired`.
    pub fn record_access(&mut self, now: DateTime<Utc>) -> DeliveryResult<()> {
        self.check_access(now)?;

        self.access_count = self
            .access_count
            .checked_add(1)
            .ok_or(DeliveryError::AccessLimitReached)?;
        self.first_accessed_at.get_or_insert(now);
        self.status = LinkStatus::Used;

        if let Some(max) = self.max_access_count {
            if self.access_count >= max {
                self.status = LinkStatus::Expired;
            }
        }
        Ok(())
    }

    /// Disable the link. Idempotent, valid from any state.
    pub fn revoke(&mut self) {
        self.status = LinkStatus::Revoked;
    }

    /// Persistable expiry transition for a lazily detected deadline.
    ///
    /// Returns `true` if the stored status changed.
    pub fn mark_expired(&mut self) -> bool {
        match self.status {
            LinkStatus::Active | LinkStatus::Used => {
                self.status = LinkStatus::Expired;
                true
            }
            LinkStatus::Expired | LinkStatus::Revoked => false,
        }
    }

    /// Rehydrate from storage. Bypasses issuance validation.
    pub(crate) fn from_record(record: LinkRecord) -> Self {
        Self {
            id: record.id,
            statement_id: record.statement_id,
            token: record.token,
            status: record.status,
            created_at: record.created_at,
            created_by: record.created_by,
            expires_at: record.expires_at,
            first_accessed_at: record.first_accessed_at,
            access_count: record.access_count,
            max_access_count: record.max_access_count,
        }
    }

    pub(crate) fn to_record(&self) -> LinkRecord {
        LinkRecord {
            id: self.id,
            statement_id: self.statement_id,
            token: self.token.clone(),
            status: self.status,
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            expires_at: self.expires_at,
            first_accessed_at: self.first_accessed_at,
            access_count: self.access_count,
            max_access_count: self.max_access_count,
        }
    }

    /// Caller-facing view of this link at `now`.
    pub fn view(&self, download_url: Option<String>, now: DateTime<Utc>) -> LinkView {
        LinkView {
            id: self.id,
            statement_id: self.statement_id,
            token: self.token.clone(),
            download_url,
            status: self.status,
            created_at: self.created_at,
            expires_at: self.expires_at,
            first_accessed_at: self.first_accessed_at,
            access_count: self.access_count,
            max_access_count: self.max_access_count,
            is_expired: self.is_expired_at(now),
        }
    }
}

/// Persisted form of a [`Link`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LinkRecord {
    pub id: Uuid,
    pub statement_id: Uuid,
    pub token: String,
    pub status: LinkStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_accessed_at: Option<DateTime<Utc>>,
    pub access_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_access_count: Option<u32>,
}

/// Link metadata as returned to API callers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkView {
    /// Link identifier (used for revocation).
    pub id: Uuid,
    /// Statement the link grants access to.
    pub statement_id: Uuid,
    /// Secret download token.
    pub token: String,
    /// Fully-qualified download URL (present on issuance).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Stored link status.
    pub status: LinkStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_accessed_at: Option<DateTime<Utc>>,
    /// Successful downloads so far.
    pub access_count: u32,
    /// Download budget (absent means unlimited).
    pub max_access_count: Option<u32>,
    /// Whether the link is expired by status or wall clock.
    pub is_expired: bool,
}
