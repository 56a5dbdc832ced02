// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::origin::ClientOrigin;
use crate::{
    auth::ApiKeyAuth,
    delivery::{DeliveryError, IssueLink},
    error::{ApiError, ErrorBody},
    models::{IssueLinkRequest, LinkResponse, RevokeLinkRequest},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/statements/{statement_id}/links",
    params(("statement_id" = Uuid, Path, description = "Statement to link to")),
    request_body = IssueLinkRequest,
    tag = "Links",
    security(("api_key" = [])),
    responses(
        (status = 201, body = LinkResponse),
        (status = 400, body = ErrorBody),
        (status = 401, body = ErrorBody),
        (status = 404, description = "Statement not found", body = ErrorBody)
    )
)]
pub async fn issue_link(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Path(statement_id): Path<Uuid>,
    ClientOrigin(origin): ClientOrigin,
    Json(request): Json<IssueLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), ApiError> {
    let view = state
        .delivery
        .issue_link(
            IssueLink {
                statement_id,
                expiration_minutes: request.expiration_minutes,
                created_by: request.created_by,
                max_access_count: request.max_access_count,
            },
            &state.public_base_url,
            &origin,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/v1/statements/{statement_id}/links",
    params(("statement_id" = Uuid, Path, description = "Statement whose links to list")),
    tag = "Links",
    security(("api_key" = [])),
    responses(
        (status = 200, body = [LinkResponse]),
        (status = 401, body = ErrorBody),
        (status = 404, description = "Statement not found", body = ErrorBody)
    )
)]
pub async fn list_links(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Path(statement_id): Path<Uuid>,
) -> Result<Json<Vec<LinkResponse>>, ApiError> {
    Ok(Json(state.delivery.links_for_statement(statement_id).await?))
}

#[utoipa::path(
    post,
    path = "/v1/links/{link_id}/revoke",
    params(("link_id" = Uuid, Path, description = "Link to revoke")),
    request_body = RevokeLinkRequest,
    tag = "Links",
    security(("api_key" = [])),
    responses(
        (status = 204, description = "Link revoked"),
        (status = 401, body = ErrorBody),
        (status = 404, description = "Link not found", body = ErrorBody)
    )
)]
pub async fn revoke_link(
    _auth: ApiKeyAuth,
    State(state): State<AppState>,
    Path(link_id): Path<Uuid>,
    ClientOrigin(origin): ClientOrigin,
    Json(request): Json<RevokeLinkRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .delivery
        .revoke(link_id, &request.revoked_by, &origin)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Metadata of a usable link. Anonymous; does not consume an access.
///
/// Every unusable link is a 404 here, expiry included; the `error_code`
/// still tells the reasons apart.
#[utoipa::path(
    get,
    path = "/v1/download/{token}/info",
    params(("token" = String, Path, description = "Download token")),
    tag = "Download",
    responses(
        (status = 200, body = LinkResponse),
        (status = 404, description = "Unknown, revoked, exhausted or expired link", body = ErrorBody)
    )
)]
pub async fn get_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<LinkResponse>, ApiError> {
    match state
        .delivery
        .link_by_token(&token, &state.public_base_url)
        .await
    {
        Ok(view) => Ok(Json(view)),
        Err(err @ DeliveryError::LinkExpired) => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "link_expired",
            err.to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}
