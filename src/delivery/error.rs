// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the delivery core.
//!
//! Link state violations are terminal and propagate unchanged to the HTTP
//! boundary, where expiry maps to a different status than not-found.
//! Nothing in the core retries.

use super::cipher::CipherError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Bad issuance parameters (caller error).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown statement or link.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("this download link has been revoked")]
    LinkRevoked,

    #[error("this download link has expired")]
    LinkExpired,

    #[error("this download link has reached its maximum access count")]
    AccessLimitReached,

    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Collaborator failure, passed through uninterpreted.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl DeliveryError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        DeliveryError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Whether this is a link state violation (revoked, expired, exhausted).
    pub fn is_link_violation(&self) -> bool {
        matches!(
            self,
            DeliveryError::LinkRevoked
                | DeliveryError::LinkExpired
                | DeliveryError::AccessLimitReached
        )
    }
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_violations_are_classified() {
        assert!(DeliveryError::LinkRevoked.is_link_violation());
        assert!(DeliveryError::LinkExpired.is_link_violation());
        assert!(DeliveryError::AccessLimitReached.is_link_violation());
        assert!(!DeliveryError::not_found("Link", "x").is_link_violation());
        assert!(!DeliveryError::Validation("bad".into()).is_link_violation());
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = DeliveryError::not_found("Statement", "abc");
        assert_eq!(err.to_string(), "Statement not found: abc");
    }
}
