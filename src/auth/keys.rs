// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Configured staff API keys.
//!
//! Keys are never held in plaintext after startup. Each one is stored as an
//! HMAC-SHA256 tag under a per-process random secret, and a presented key
//! is tagged the same way and compared in constant time against every
//! entry.

use std::fmt;

use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};

/// Set of accepted API keys.
pub struct ApiKeys {
    keyed: hmac::Key,
    tags: Vec<hmac::Tag>,
}

impl ApiKeys {
    /// Build the key set. Blank entries are ignored.
    ///
    /// Returns `None` if the system RNG is unavailable.
    pub fn new<I, S>(keys: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut secret = [0u8; 32];
        SystemRandom::new().fill(&mut secret).ok()?;
        let keyed = hmac::Key::new(hmac::HMAC_SHA256, &secret);

        let tags = keys
            .into_iter()
            .filter_map(|key| {
                let key = key.as_ref().trim();
                (!key.is_empty()).then(|| hmac::sign(&keyed, key.as_bytes()))
            })
            .collect();
        Some(Self { keyed, tags })
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Whether `candidate` is one of the configured keys.
    ///
    /// Every entry is checked, so timing does not reveal which one matched.
    pub fn verify(&self, candidate: &str) -> bool {
        self.tags.iter().fold(false, |found, tag| {
            hmac::verify(&self.keyed, candidate.as_bytes(), tag.as_ref()).is_ok() | found
        })
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("count", &self.tags.len())
            .finish_non_exhaustive()
    }
}
