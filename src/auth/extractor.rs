// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for staff API-key authentication.
//!
//! ```rust,ignore
//! async fn revoke_link(_auth: ApiKeyAuth, State(state): State<AppState>) -> ... {
//!     // only reached with a valid X-API-Key
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::AuthError;
use crate::state::AppState;

/// Header carrying the staff API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the request carried a configured API key.
#[derive(Debug, Clone, Copy)]
pub struct ApiKeyAuth;

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(API_KEY_HEADER)
            .ok_or(AuthError::MissingApiKey)?
            .to_str()
            .map_err(|_| AuthError::InvalidApiKey)?;

        if state.api_keys.verify(key.trim()) {
            Ok(ApiKeyAuth)
        } else {
            tracing::warn!(path = %parts.uri.path(), "Rejected request with invalid API key");
            Err(AuthError::InvalidApiKey)
        }
    }
}
