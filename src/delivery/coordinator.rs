// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Serialized access to links.
//!
//! Every check-then-mutate-then-save on a link runs under a per-token async
//! lock, so concurrent downloads of a single-use link produce exactly one
//! success. Locks are keyed by token and dropped once no task holds them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::clock::Clock;
use super::error::{DeliveryError, DeliveryResult};
use super::link::{is_well_formed_token, Link};
use crate::storage::LinkStore;

type TokenLock = tokio::sync::Mutex<()>;

/// Registry of per-token exclusion locks.
#[derive(Default)]
struct TokenLocks {
    inner: Mutex<HashMap<String, Weak<TokenLock>>>,
}

impl TokenLocks {
    async fn acquire(&self, token: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match map.get(token).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    map.retain(|_, weak| weak.strong_count() > 0);
                    let lock = Arc::new(TokenLock::new(()));
                    map.insert(token.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn live_entries(&self) -> usize {
        self.inner
            .lock()
            .map(|map| map.values().filter(|weak| weak.strong_count() > 0).count())
            .unwrap_or(0)
    }
}

/// Gatekeeper for every state transition on an existing link.
pub struct LinkAccessCoordinator {
    links: Arc<dyn LinkStore>,
    clock: Arc<dyn Clock>,
    locks: TokenLocks,
}

impl LinkAccessCoordinator {
    pub fn new(links: Arc<dyn LinkStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            links,
            clock,
            locks: TokenLocks::default(),
        }
    }

    /// Validate the link behind `token` and consume one access.
    ///
    /// On success the updated link has already been persisted. A lazily
    /// detected expiry is persisted before the violation is returned.
    pub async fn authorize_and_consume(&self, token: &str) -> DeliveryResult<Link> {
        if !is_well_formed_token(token) {
            return Err(DeliveryError::not_found("Link", "token"));
        }

        let _guard = self.locks.acquire(token).await;

        let mut link = self
            .links
            .get_by_token(token)
            .await?
            .ok_or_else(|| DeliveryError::not_found("Link", "token"))?;

        let now = self.clock.now();
        if let Err(violation) = link.check_access(now) {
            return Err(self.deny(link, violation).await);
        }

        link.record_access(now)?;
        self.links.save(&link).await?;

        tracing::info!(
            link_id = %link.id(),
            access_count = link.access_count(),
            status = ?link.status(),
            "Link access granted"
        );
        Ok(link)
    }

    /// Look up a usable link by token without consuming an access.
    ///
    /// Unusable links fail exactly as a download would, including the
    /// persisted expiry transition.
    pub async fn inspect(&self, token: &str) -> DeliveryResult<Link> {
        if !is_well_formed_token(token) {
            return Err(DeliveryError::not_found("Link", "token"));
        }

        let _guard = self.locks.acquire(token).await;

        let link = self
            .links
            .get_by_token(token)
            .await?
            .ok_or_else(|| DeliveryError::not_found("Link", "token"))?;

        match link.check_access(self.clock.now()) {
            Ok(()) => Ok(link),
            Err(violation) => Err(self.deny(link, violation).await),
        }
    }

    /// Persist a lazily detected expiry, then hand the violation back.
    ///
    /// Must run under the token lock. A failed persist is logged and the
    /// violation still wins.
    async fn deny(&self, mut link: Link, violation: DeliveryError) -> DeliveryError {
        if matches!(violation, DeliveryError::LinkExpired) && link.mark_expired() {
            match self.links.save(&link).await {
                Ok(()) => tracing::info!(link_id = %link.id(), "Link expired"),
                Err(e) => {
                    tracing::warn!(link_id = %link.id(), error = %e, "Failed to persist link expiry")
                }
            }
        }
        tracing::warn!(link_id = %link.id(), reason = %violation, "Link access denied");
        violation
    }

    /// Revoke a link by id. Idempotent.
    ///
    /// Runs under the link's token lock and re-reads inside it, so an
    /// in-flight access cannot overwrite the revocation.
    pub async fn revoke(&self, link_id: Uuid) -> DeliveryResult<Link> {
        let token = self
            .links
            .get(link_id)
            .await?
            .ok_or_else(|| DeliveryError::not_found("Link", link_id))?
            .token()
            .to_string();

        let _guard = self.locks.acquire(&token).await;

        let mut link = self
            .links
            .get(link_id)
            .await?
            .ok_or_else(|| DeliveryError::not_found("Link", link_id))?;
        link.revoke();
        self.links.save(&link).await?;

        tracing::info!(link_id = %link.id(), "Link revoked");
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::clock::ManualClock;
    use crate::delivery::link::LinkStatus;
    use crate::storage::MemoryLinkStore;
    use chrono::{Duration, Utc};

    struct Harness {
        store: Arc<MemoryLinkStore>,
        clock: Arc<ManualClock>,
        coordinator: Arc<LinkAccessCoordinator>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryLinkStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let coordinator = Arc::new(LinkAccessCoordinator::new(store.clone(), clock.clone()));
        Harness {
            store,
            clock,
            coordinator,
        }
    }

    async fn seed(h: &Harness, minutes: i64, max: Option<u32>) -> Link {
        let link = Link::issue(Uuid::new_v4(), minutes, "ops", max, h.clock.now()).unwrap();
        h.store.save(&link).await.unwrap();
        link
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_single_use_yields_exactly_one_success() {
        let h = harness();
        let link = seed(&h, 60, Some(1)).await;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let coordinator = h.coordinator.clone();
            let token = link.token().to_string();
            handles.push(tokio::spawn(async move {
                coordinator.authorize_and_consume(&token).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert!(e.is_link_violation(), "unexpected error: {e}"),
            }
        }
        assert_eq!(successes, 1);

        let stored = h.store.get(link.id()).await.unwrap().unwrap();
        assert_eq!(stored.access_count(), 1);
        assert_eq!(stored.status(), LinkStatus::Expired);
        assert_eq!(h.coordinator.locks.live_entries(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_accesses_on_budget_of_three() {
        let h = harness();
        let link = seed(&h, 60, Some(3)).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let coordinator = h.coordinator.clone();
            let token = link.token().to_string();
            handles.push(tokio::spawn(async move {
                coordinator.authorize_and_consume(&token).await.is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 3);
        assert_eq!(h.store.get(link.id()).await.unwrap().unwrap().access_count(), 3);
    }

    #[tokio::test]
    async fn unlimited_link_counts_every_access() {
        let h = harness();
        let link = seed(&h, 60, None).await;

        for _ in 0..3 {
            h.coordinator.authorize_and_consume(link.token()).await.unwrap();
        }

        let stored = h.store.get(link.id()).await.unwrap().unwrap();
        assert_eq!(stored.access_count(), 3);
        assert_eq!(stored.status(), LinkStatus::Used);
    }

    #[tokio::test]
    async fn lazy_expiry_is_persisted() {
        let h = harness();
        let link = seed(&h, 60, None).await;

        h.clock.set(link.expires_at() + Duration::seconds(1));
        let result = h.coordinator.authorize_and_consume(link.token()).await;
        assert!(matches!(result, Err(DeliveryError::LinkExpired)));

        let stored = h.store.get(link.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), LinkStatus::Expired);
        assert_eq!(stored.access_count(), 0);
    }

    #[tokio::test]
    async fn expiry_violation_survives_failed_persist() {
        let h = harness();
        let link = seed(&h, 60, None).await;

        h.clock.advance(Duration::hours(2));
        h.store.fail_saves(true);
        let result = h.coordinator.authorize_and_consume(link.token()).await;
        assert!(matches!(result, Err(DeliveryError::LinkExpired)));
    }

    #[tokio::test]
    async fn failed_save_denies_access() {
        let h = harness();
        let link = seed(&h, 60, Some(1)).await;

        h.store.fail_saves(true);
        let result = h.coordinator.authorize_and_consume(link.token()).await;
        assert!(matches!(result, Err(DeliveryError::Storage(_))));

        h.store.fail_saves(false);
        let stored = h.store.get(link.id()).await.unwrap().unwrap();
        assert_eq!(stored.access_count(), 0);
        assert!(h.coordinator.authorize_and_consume(link.token()).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_and_malformed_tokens_are_not_found() {
        let h = harness();
        let unknown = crate::delivery::link::generate_token().unwrap();

        for token in [unknown.as_str(), "not-a-token", ""] {
            let result = h.coordinator.authorize_and_consume(token).await;
            assert!(matches!(result, Err(DeliveryError::NotFound { .. })));
            let result = h.coordinator.inspect(token).await;
            assert!(matches!(result, Err(DeliveryError::NotFound { .. })));
        }
    }

    #[tokio::test]
    async fn inspect_does_not_consume() {
        let h = harness();
        let link = seed(&h, 60, Some(1)).await;

        let seen = h.coordinator.inspect(link.token()).await.unwrap();
        assert_eq!(seen.access_count(), 0);
        assert!(h.coordinator.authorize_and_consume(link.token()).await.is_ok());

        let result = h.coordinator.inspect(link.token()).await;
        assert!(matches!(
            result,
            Err(DeliveryError::LinkExpired) | Err(DeliveryError::AccessLimitReached)
        ));
    }

    #[tokio::test]
    async fn inspect_persists_lazy_expiry() {
        let h = harness();
        let link = seed(&h, 60, None).await;

        h.clock.advance(Duration::minutes(61));
        let result = h.coordinator.inspect(link.token()).await;
        assert!(matches!(result, Err(DeliveryError::LinkExpired)));
        let stored = h.store.get(link.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), LinkStatus::Expired);
    }

    #[tokio::test]
    async fn revoke_blocks_later_access() {
        let h = harness();
        let link = seed(&h, 60, None).await;
        h.coordinator.authorize_and_consume(link.token()).await.unwrap();

        let revoked = h.coordinator.revoke(link.id()).await.unwrap();
        assert_eq!(revoked.status(), LinkStatus::Revoked);
        assert_eq!(revoked.access_count(), 1);

        let result = h.coordinator.authorize_and_consume(link.token()).await;
        assert!(matches!(result, Err(DeliveryError::LinkRevoked)));
    }

    #[tokio::test]
    async fn revoke_expired_link_is_idempotent() {
        let h = harness();
        let link = seed(&h, 60, Some(1)).await;
        h.coordinator.authorize_and_consume(link.token()).await.unwrap();

        h.coordinator.revoke(link.id()).await.unwrap();
        let again = h.coordinator.revoke(link.id()).await.unwrap();
        assert_eq!(again.status(), LinkStatus::Revoked);
    }

    #[tokio::test]
    async fn revoke_unknown_link_is_not_found() {
        let h = harness();
        let result = h.coordinator.revoke(Uuid::new_v4()).await;
        assert!(matches!(result, Err(DeliveryError::NotFound { resource: "Link", .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn revoke_racing_access_is_never_lost() {
        let h = harness();
        let link = seed(&h, 60, None).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let coordinator = h.coordinator.clone();
            let token = link.token().to_string();
            handles.push(tokio::spawn(async move {
                let _ = coordinator.authorize_and_consume(&token).await;
            }));
        }
        h.coordinator.revoke(link.id()).await.unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = h.store.get(link.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), LinkStatus::Revoked);
    }
}
