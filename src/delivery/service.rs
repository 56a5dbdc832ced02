// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Delivery orchestration.
//!
//! `DeliveryService` is the only component that talks to the storage
//! collaborators. It composes the coordinator, the cipher and the audit
//! recorder into the issue / download / revoke flows.
//!
//! Download ordering: the access is authorized and committed first, then the
//! ciphertext is fetched and decrypted outside the token lock. An access that
//! is committed but never delivered (client gone, decrypt failure) stays
//! consumed.

use std::sync::Arc;

use url::Url;
use uuid::Uuid;

use super::audit::{AuditEvent, AuditRecorder};
use super::cipher::FileCipher;
use super::clock::Clock;
use super::coordinator::LinkAccessCoordinator;
use super::error::{DeliveryError, DeliveryResult};
use super::link::{Link, LinkView};
use super::statement::{FileKind, StatementRecord};
use crate::storage::{AuditStore, BlobStore, LinkStore, StatementStore};

/// Parameters for issuing a link.
#[derive(Debug, Clone)]
pub struct IssueLink {
    pub statement_id: Uuid,
    /// Lifetime in minutes; `None` uses the service default.
    pub expiration_minutes: Option<i64>,
    pub created_by: String,
    pub max_access_count: Option<u32>,
}

/// A decrypted statement ready to stream to the caller.
#[derive(Debug)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: &'static str,
}

/// Plaintext handed to [`DeliveryService::seal_statement`].
#[derive(Debug, Clone)]
pub struct NewStatement {
    pub account_number: String,
    pub file_name: String,
    pub file_kind: Option<FileKind>,
    pub uploaded_by: String,
}

/// Storage collaborators the service runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub links: Arc<dyn LinkStore>,
    pub statements: Arc<dyn StatementStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub audit: Arc<dyn AuditStore>,
}

pub struct DeliveryService {
    statements: Arc<dyn StatementStore>,
    blobs: Arc<dyn BlobStore>,
    links: Arc<dyn LinkStore>,
    coordinator: LinkAccessCoordinator,
    recorder: AuditRecorder,
    cipher: FileCipher,
    clock: Arc<dyn Clock>,
    default_link_minutes: i64,
}

impl DeliveryService {
    pub fn new(
        stores: Collaborators,
        cipher: FileCipher,
        clock: Arc<dyn Clock>,
        default_link_minutes: i64,
    ) -> Self {
        Self {
            coordinator: LinkAccessCoordinator::new(stores.links.clone(), clock.clone()),
            recorder: AuditRecorder::new(stores.audit),
            statements: stores.statements,
            blobs: stores.blobs,
            links: stores.links,
            cipher,
            clock,
            default_link_minutes,
        }
    }

    /// Issue a link for an existing statement.
    ///
    /// The returned view carries `base_url/v1/download/{token}`.
    pub async fn issue_link(
        &self,
        request: IssueLink,
        base_url: &Url,
        origin: &str,
    ) -> DeliveryResult<LinkView> {
        if !self.statements.exists(request.statement_id).await? {
            return Err(DeliveryError::not_found("Statement", request.statement_id));
        }

        let minutes = request
            .expiration_minutes
            .unwrap_or(self.default_link_minutes);
        let now = self.clock.now();
        let link = Link::issue(
            request.statement_id,
            minutes,
            &request.created_by,
            request.max_access_count,
            now,
        )?;
        let url = download_url(base_url, link.token())?;
        self.links.save(&link).await?;

        let audited = self
            .recorder
            .record(AuditEvent::issued(
                link.statement_id(),
                link.id(),
                link.created_by(),
                origin,
                minutes,
                link.max_access_count(),
                now,
            ))
            .await;
        if let Err(e) = audited {
            // An unaudited link must never become usable.
            if let Err(revoke_err) = self.coordinator.revoke(link.id()).await {
                tracing::error!(
                    link_id = %link.id(),
                    error = %revoke_err,
                    "Failed to revoke unaudited link"
                );
            }
            return Err(e);
        }

        tracing::info!(
            link_id = %link.id(),
            statement_id = %link.statement_id(),
            expires_at = %link.expires_at(),
            max_access_count = ?link.max_access_count(),
            "Download link issued"
        );

        Ok(link.view(Some(url), now))
    }

    /// Current view of a usable link. Does not consume an access.
    pub async fn link_by_token(&self, token: &str, base_url: &Url) -> DeliveryResult<LinkView> {
        let link = self.coordinator.inspect(token).await?;
        let url = download_url(base_url, link.token())?;
        Ok(link.view(Some(url), self.clock.now()))
    }

    /// All links issued for a statement, oldest first.
    pub async fn links_for_statement(&self, statement_id: Uuid) -> DeliveryResult<Vec<LinkView>> {
        if !self.statements.exists(statement_id).await? {
            return Err(DeliveryError::not_found("Statement", statement_id));
        }
        let now = self.clock.now();
        Ok(self
            .links
            .list_by_statement(statement_id)
            .await?
            .iter()
            .map(|link| link.view(None, now))
            .collect())
    }

    /// Authorize, decrypt and audit one download.
    pub async fn download(&self, token: &str, origin: &str) -> DeliveryResult<Download> {
        let link = self.coordinator.authorize_and_consume(token).await?;

        let statement = self
            .statements
            .resolve(link.statement_id())
            .await?
            .ok_or_else(|| DeliveryError::not_found("Statement", link.statement_id()))?;

        let ciphertext = self.blobs.read(&statement.storage_ref).await?;
        let bytes = self
            .cipher
            .decrypt(ciphertext.as_slice(), &statement.key_id)
            .map_err(|e| {
                tracing::error!(
                    link_id = %link.id(),
                    statement_id = %statement.id,
                    "Stored ciphertext failed to decrypt"
                );
                DeliveryError::from(e)
            })?;

        self.recorder
            .record(AuditEvent::downloaded(
                statement.id,
                link.id(),
                origin,
                link.access_count(),
                self.clock.now(),
            ))
            .await?;

        tracing::info!(
            link_id = %link.id(),
            statement_id = %statement.id,
            access_count = link.access_count(),
            size = bytes.len(),
            "Statement downloaded"
        );

        Ok(Download {
            bytes,
            file_name: statement.file_name,
            content_type: statement.file_kind.content_type(),
        })
    }

    /// Revoke a link and record who did it. Idempotent.
    pub async fn revoke(&self, link_id: Uuid, actor: &str, origin: &str) -> DeliveryResult<LinkView> {
        if actor.trim().is_empty() {
            return Err(DeliveryError::Validation(
                "revoked by cannot be empty".to_string(),
            ));
        }

        let link = self.coordinator.revoke(link_id).await?;
        let now = self.clock.now();

        // A failed append is reported, but the revocation stands.
        self.recorder
            .record(AuditEvent::revoked(
                link.statement_id(),
                link.id(),
                actor.trim(),
                origin,
                now,
            ))
            .await?;

        Ok(link.view(None, now))
    }

    /// Encrypt a statement file and register it as a link target.
    ///
    /// If saving the record fails, the freshly written blob is removed.
    pub async fn seal_statement(
        &self,
        statement: NewStatement,
        plaintext: &[u8],
    ) -> DeliveryResult<StatementRecord> {
        if statement.file_name.trim().is_empty() {
            return Err(DeliveryError::Validation(
                "file name cannot be empty".to_string(),
            ));
        }

        let key_id = self.cipher.new_key_id();
        let ciphertext = self.cipher.encrypt(plaintext, &key_id)?;
        let storage_ref = self.blobs.write(&ciphertext, &statement.file_name).await?;

        let record = StatementRecord {
            id: Uuid::new_v4(),
            account_number: statement.account_number,
            file_kind: statement
                .file_kind
                .unwrap_or_else(|| FileKind::from_file_name(&statement.file_name)),
            file_name: statement.file_name,
            file_size_bytes: plaintext.len() as u64,
            storage_ref,
            key_id,
            uploaded_at: self.clock.now(),
            uploaded_by: statement.uploaded_by,
        };

        if let Err(e) = self.statements.save(&record).await {
            if let Err(cleanup) = self.blobs.delete(&record.storage_ref).await {
                tracing::warn!(error = %cleanup, "Failed to remove orphaned blob");
            }
            return Err(e.into());
        }

        tracing::info!(
            statement_id = %record.id,
            size = record.file_size_bytes,
            "Statement sealed"
        );
        Ok(record)
    }
}

/// `base_url` + `/v1/download/{token}`, keeping any base path prefix.
fn download_url(base_url: &Url, token: &str) -> DeliveryResult<String> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| DeliveryError::Validation("base url cannot carry a path".to_string()))?
        .pop_if_empty()
        .extend(["v1", "download", token]);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::audit::AuditAction;
    use crate::delivery::cipher::{CipherKey, DerivedKeys};
    use crate::delivery::clock::ManualClock;
    use crate::delivery::link::LinkStatus;
    use crate::storage::{MemoryAuditStore, MemoryBlobStore, MemoryLinkStore, MemoryStatementStore};
    use chrono::{Duration, Utc};

    const PDF: &[u8] = b"%PDF-1.7 march statement";

    struct Harness {
        service: DeliveryService,
        links: Arc<MemoryLinkStore>,
        blobs: Arc<MemoryBlobStore>,
        audit: Arc<MemoryAuditStore>,
        clock: Arc<ManualClock>,
        base: Url,
    }

    fn harness() -> Harness {
        let links = Arc::new(MemoryLinkStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let audit = Arc::new(MemoryAuditStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cipher = FileCipher::new(Arc::new(DerivedKeys::new(CipherKey::from_bytes([9u8; 32]))));
        let service = DeliveryService::new(
            Collaborators {
                links: links.clone(),
                statements: Arc::new(MemoryStatementStore::new()),
                blobs: blobs.clone(),
                audit: audit.clone(),
            },
            cipher,
            clock.clone(),
            60,
        );
        Harness {
            service,
            links,
            blobs,
            audit,
            clock,
            base: Url::parse("https://statements.example.com").unwrap(),
        }
    }

    async fn seal(h: &Harness) -> StatementRecord {
        h.service
            .seal_statement(
                NewStatement {
                    account_number: "ACC-001".into(),
                    file_name: "march.pdf".into(),
                    file_kind: None,
                    uploaded_by: "ops".into(),
                },
                PDF,
            )
            .await
            .unwrap()
    }

    fn issue(statement_id: Uuid, max: Option<u32>) -> IssueLink {
        IssueLink {
            statement_id,
            expiration_minutes: Some(60),
            created_by: "ops@bank".into(),
            max_access_count: max,
        }
    }

    #[tokio::test]
    async fn sealed_statement_is_encrypted_at_rest() {
        let h = harness();
        let record = seal(&h).await;

        assert_eq!(record.file_kind, FileKind::Pdf);
        assert_eq!(record.file_size_bytes, PDF.len() as u64);
        assert!(record.key_id.starts_with("key_"));
        let stored = h.blobs.read(&record.storage_ref).await.unwrap();
        assert_ne!(stored.as_slice(), PDF);
    }

    #[tokio::test]
    async fn issue_builds_download_url_and_audits() {
        let h = harness();
        let record = seal(&h).await;

        let view = h.service.issue_link(issue(record.id, Some(1)), &h.base, "10.0.0.1").await.unwrap();

        assert_eq!(
            view.download_url.as_deref(),
            Some(format!("https://statements.example.com/v1/download/{}", view.token).as_str())
        );
        assert_eq!(view.status, LinkStatus::Active);
        assert_eq!(view.access_count, 0);
        assert_eq!(view.max_access_count, Some(1));

        let events = h.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action(), AuditAction::Issued);
        assert_eq!(events[0].actor(), "ops@bank");
        assert_eq!(events[0].origin(), "10.0.0.1");
    }

    #[tokio::test]
    async fn issue_uses_default_lifetime() {
        let h = harness();
        let record = seal(&h).await;
        let mut request = issue(record.id, None);
        request.expiration_minutes = None;

        let view = h.service.issue_link(request, &h.base, "").await.unwrap();
        assert_eq!(view.expires_at - view.created_at, Duration::minutes(60));
    }

    #[tokio::test]
    async fn issue_for_unknown_statement_is_not_found() {
        let h = harness();
        let result = h.service.issue_link(issue(Uuid::new_v4(), None), &h.base, "").await;

        assert!(matches!(result, Err(DeliveryError::NotFound { resource: "Statement", .. })));
        assert!(h.audit.events().is_empty());
    }

    #[tokio::test]
    async fn issue_rejects_invalid_parameters() {
        let h = harness();
        let record = seal(&h).await;
        let mut request = issue(record.id, None);
        request.expiration_minutes = Some(0);

        let result = h.service.issue_link(request, &h.base, "").await;
        assert!(matches!(result, Err(DeliveryError::Validation(_))));
    }

    #[test]
    fn download_url_keeps_base_path() {
        let base = Url::parse("https://bank.example/statements/").unwrap();
        let url = download_url(&base, "tok").unwrap();
        assert_eq!(url, "https://bank.example/statements/v1/download/tok");
    }

    #[tokio::test]
    async fn download_three_times_on_unlimited_link() {
        let h = harness();
        let record = seal(&h).await;
        let view = h.service.issue_link(issue(record.id, None), &h.base, "").await.unwrap();

        for expected in 1..=3 {
            let download = h.service.download(&view.token, "203.0.113.9").await.unwrap();
            assert_eq!(download.bytes, PDF);
            assert_eq!(download.file_name, "march.pdf");
            assert_eq!(download.content_type, "application/pdf");

            let link = h.links.get(view.id).await.unwrap().unwrap();
            assert_eq!(link.access_count(), expected);
            assert_eq!(link.status(), LinkStatus::Used);
        }

        let downloads: Vec<_> = h
            .audit
            .events()
            .into_iter()
            .filter(|e| e.action() == AuditAction::Downloaded)
            .collect();
        assert_eq!(downloads.len(), 3);
        assert!(downloads.iter().all(|e| e.origin() == "203.0.113.9"));
        assert!(!downloads[0].detail().to_string().contains(&view.token));
    }

    #[tokio::test]
    async fn single_use_link_downloads_once() {
        let h = harness();
        let record = seal(&h).await;
        let view = h.service.issue_link(issue(record.id, Some(1)), &h.base, "").await.unwrap();

        h.service.download(&view.token, "").await.unwrap();
        let second = h.service.download(&view.token, "").await;
        assert!(matches!(
            second,
            Err(DeliveryError::LinkExpired) | Err(DeliveryError::AccessLimitReached)
        ));
    }

    #[tokio::test]
    async fn expired_link_fails_with_link_expired() {
        let h = harness();
        let record = seal(&h).await;
        let view = h.service.issue_link(issue(record.id, None), &h.base, "").await.unwrap();

        h.clock.set(view.expires_at + Duration::seconds(1));
        let result = h.service.download(&view.token, "").await;
        assert!(matches!(result, Err(DeliveryError::LinkExpired)));
    }

    #[tokio::test]
    async fn tampered_ciphertext_consumes_access_and_fails_generically() {
        let h = harness();
        let record = seal(&h).await;
        let view = h.service.issue_link(issue(record.id, Some(2)), &h.base, "").await.unwrap();

        h.blobs.replace(&record.storage_ref, vec![0u8; 8]).unwrap();
        let result = h.service.download(&view.token, "").await;
        assert!(matches!(result, Err(DeliveryError::Cipher(_))));

        let link = h.links.get(view.id).await.unwrap().unwrap();
        assert_eq!(link.access_count(), 1);
    }

    #[tokio::test]
    async fn revoke_records_actor_and_blocks_download() {
        let h = harness();
        let record = seal(&h).await;
        let view = h.service.issue_link(issue(record.id, None), &h.base, "").await.unwrap();

        let revoked = h.service.revoke(view.id, "security@bank", "10.1.1.1").await.unwrap();
        assert_eq!(revoked.status, LinkStatus::Revoked);

        let event = h.audit.events().pop().unwrap();
        assert_eq!(event.action(), AuditAction::Revoked);
        assert_eq!(event.actor(), "security@bank");
        assert_eq!(event.link_id(), view.id);

        let result = h.service.download(&view.token, "").await;
        assert!(matches!(result, Err(DeliveryError::LinkRevoked)));
        let result = h.service.link_by_token(&view.token, &h.base).await;
        assert!(matches!(result, Err(DeliveryError::LinkRevoked)));
    }

    #[tokio::test]
    async fn failed_issue_audit_leaves_no_usable_link() {
        let h = harness();
        let record = seal(&h).await;

        h.audit.fail_appends(true);
        let result = h.service.issue_link(issue(record.id, None), &h.base, "").await;
        assert!(matches!(result, Err(DeliveryError::Storage(_))));
        h.audit.fail_appends(false);

        let links = h.links.list_by_statement(record.id).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].status(), LinkStatus::Revoked);
        let result = h.service.download(links[0].token(), "").await;
        assert!(matches!(result, Err(DeliveryError::LinkRevoked)));
    }

    #[tokio::test]
    async fn failed_revoke_audit_still_revokes() {
        let h = harness();
        let record = seal(&h).await;
        let view = h.service.issue_link(issue(record.id, None), &h.base, "").await.unwrap();

        h.audit.fail_appends(true);
        let result = h.service.revoke(view.id, "security@bank", "").await;
        assert!(matches!(result, Err(DeliveryError::Storage(_))));
        h.audit.fail_appends(false);

        let link = h.links.get(view.id).await.unwrap().unwrap();
        assert_eq!(link.status(), LinkStatus::Revoked);
        let result = h.service.download(&view.token, "").await;
        assert!(matches!(result, Err(DeliveryError::LinkRevoked)));
        assert_eq!(h.audit.events().len(), 1);
    }

    #[tokio::test]
    async fn revoke_unknown_link_is_not_found() {
        let h = harness();
        let result = h.service.revoke(Uuid::new_v4(), "ops", "").await;
        assert!(matches!(result, Err(DeliveryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn links_listed_per_statement() {
        let h = harness();
        let first = seal(&h).await;
        let second = seal(&h).await;

        h.service.issue_link(issue(first.id, None), &h.base, "").await.unwrap();
        h.clock.advance(Duration::seconds(1));
        h.service.issue_link(issue(first.id, Some(1)), &h.base, "").await.unwrap();
        h.service.issue_link(issue(second.id, None), &h.base, "").await.unwrap();

        let listed = h.service.links_for_statement(first.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at <= listed[1].created_at);
        assert!(listed.iter().all(|v| v.download_url.is_none()));

        let missing = h.service.links_for_statement(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(DeliveryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn link_by_token_does_not_consume() {
        let h = harness();
        let record = seal(&h).await;
        let view = h.service.issue_link(issue(record.id, Some(1)), &h.base, "").await.unwrap();

        let seen = h.service.link_by_token(&view.token, &h.base).await.unwrap();
        assert_eq!(seen.access_count, 0);
        assert_eq!(seen.download_url, view.download_url);
        assert!(h.service.download(&view.token, "").await.is_ok());
    }
}
