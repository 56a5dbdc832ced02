// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail for link issuance, downloads and revocations.
//!
//! Events are immutable once built and are only created through the
//! action-specific constructors below. The storage layer reads them back
//! through a crate-private record type.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::DeliveryResult;
use crate::storage::AuditStore;

/// Actor recorded for anonymous token downloads.
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Origin recorded when the requester's address is unknown.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Auditable link actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Issued,
    Downloaded,
    Revoked,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct AuditEvent {
    event_id: Uuid,
    statement_id: Uuid,
    link_id: Uuid,
    actor: String,
    origin: String,
    action: AuditAction,
    timestamp: DateTime<Utc>,
    #[schema(value_type = Object)]
    detail: serde_json::Value,
}

impl AuditEvent {
    fn new(
        action: AuditAction,
        statement_id: Uuid,
        link_id: Uuid,
        actor: &str,
        origin: &str,
        detail: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let origin = origin.trim();
        Self {
            event_id: Uuid::new_v4(),
            statement_id,
            link_id,
            actor: actor.to_string(),
            origin: if origin.is_empty() {
                UNKNOWN_ORIGIN.to_string()
            } else {
                origin.to_string()
            },
            action,
            timestamp,
            detail,
        }
    }

    /// A link was issued.
    pub fn issued(
        statement_id: Uuid,
        link_id: Uuid,
        created_by: &str,
        origin: &str,
        expiration_minutes: i64,
        max_access_count: Option<u32>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            AuditAction::Issued,
            statement_id,
            link_id,
            created_by,
            origin,
            json!({
                "expiration_minutes": expiration_minutes,
                "max_access_count": max_access_count,
            }),
            at,
        )
    }

    /// A statement was downloaded through a link.
    ///
    /// Only the link id is recorded; the token itself never enters the log.
    pub fn downloaded(
        statement_id: Uuid,
        link_id: Uuid,
        origin: &str,
        access_count: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            AuditAction::Downloaded,
            statement_id,
            link_id,
            ANONYMOUS_ACTOR,
            origin,
            json!({ "access_count": access_count }),
            at,
        )
    }

    /// A link was revoked.
    pub fn revoked(
        statement_id: Uuid,
        link_id: Uuid,
        revoked_by: &str,
        origin: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            AuditAction::Revoked,
            statement_id,
            link_id,
            revoked_by,
            origin,
            serde_json::Value::Null,
            at,
        )
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn statement_id(&self) -> Uuid {
        self.statement_id
    }

    pub fn link_id(&self) -> Uuid {
        self.link_id
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn detail(&self) -> &serde_json::Value {
        &self.detail
    }

    pub(crate) fn from_record(record: AuditEventRecord) -> Self {
        Self {
            event_id: record.event_id,
            statement_id: record.statement_id,
            link_id: record.link_id,
            actor: record.actor,
            origin: record.origin,
            action: record.action,
            timestamp: record.timestamp,
            detail: record.detail,
        }
    }
}

/// Persisted form of an [`AuditEvent`].
#[derive(Debug, Deserialize)]
pub(crate) struct AuditEventRecord {
    event_id: Uuid,
    statement_id: Uuid,
    link_id: Uuid,
    actor: String,
    origin: String,
    action: AuditAction,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    detail: serde_json::Value,
}

/// Appends audit events to the configured store.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append one event. Store failures propagate to the caller.
    pub async fn record(&self, event: AuditEvent) -> DeliveryResult<()> {
        self.store.append(&event).await.map_err(|e| {
            tracing::error!(
                action = ?event.action(),
                link_id = %event.link_id(),
                error = %e,
                "Failed to append audit event"
            );
            e
        })?;

        tracing::debug!(
            action = ?event.action(),
            link_id = %event.link_id(),
            statement_id = %event.statement_id(),
            "Audit event recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_event_carries_lifetime() {
        let now = Utc::now();
        let (statement, link) = (Uuid::new_v4(), Uuid::new_v4());
        let event = AuditEvent::issued(statement, link, "ops@bank", "10.0.0.1", 60, Some(1), now);

        assert_eq!(event.action(), AuditAction::Issued);
        assert_eq!(event.statement_id(), statement);
        assert_eq!(event.link_id(), link);
        assert_eq!(event.actor(), "ops@bank");
        assert_eq!(event.origin(), "10.0.0.1");
        assert_eq!(event.timestamp(), now);
        assert_eq!(event.detail()["expiration_minutes"], 60);
        assert_eq!(event.detail()["max_access_count"], 1);
    }

    #[test]
    fn download_event_is_anonymous() {
        let event = AuditEvent::downloaded(Uuid::new_v4(), Uuid::new_v4(), "", 2, Utc::now());

        assert_eq!(event.action(), AuditAction::Downloaded);
        assert_eq!(event.actor(), ANONYMOUS_ACTOR);
        assert_eq!(event.origin(), UNKNOWN_ORIGIN);
        assert_eq!(event.detail()["access_count"], 2);
    }

    #[test]
    fn record_round_trip() {
        let event = AuditEvent::revoked(Uuid::new_v4(), Uuid::new_v4(), "ops", "1.2.3.4", Utc::now());
        let line = serde_json::to_string(&event).unwrap();
        let restored = AuditEvent::from_record(serde_json::from_str(&line).unwrap());

        assert_eq!(restored, event);
        assert!(line.contains("\"action\":\"revoked\""));
    }
}
