// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Field names are camelCase
//! on the wire. Link responses reuse [`LinkView`] from the delivery core.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use crate::delivery::LinkView as LinkResponse;

/// Body of `POST /v1/statements/{statement_id}/links`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueLinkRequest {
    /// Link lifetime in minutes. Defaults to `DEFAULT_LINK_MINUTES`.
    #[serde(default)]
    pub expiration_minutes: Option<i64>,
    /// Download budget. Omit for unlimited.
    #[serde(default)]
    pub max_access_count: Option<u32>,
    /// Staff member issuing the link.
    pub created_by: String,
}

/// Body of `POST /v1/links/{link_id}/revoke`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokeLinkRequest {
    /// Staff member revoking the link.
    pub revoked_by: String,
}
