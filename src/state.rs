// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use url::Url;

use crate::auth::ApiKeys;
use crate::delivery::DeliveryService;
use crate::storage::FileStorage;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub delivery: Arc<DeliveryService>,
    pub storage: Arc<FileStorage>,
    pub api_keys: Arc<ApiKeys>,
    pub public_base_url: Arc<Url>,
}

impl AppState {
    pub fn new(
        delivery: DeliveryService,
        storage: FileStorage,
        api_keys: ApiKeys,
        public_base_url: Url,
    ) -> Self {
        Self {
            delivery: Arc::new(delivery),
            storage: Arc::new(storage),
            api_keys: Arc::new(api_keys),
            public_base_url: Arc::new(public_base_url),
        }
    }
}
