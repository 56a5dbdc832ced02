// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    delivery::LinkStatus,
    error::ErrorBody,
    models::{IssueLinkRequest, LinkResponse, RevokeLinkRequest},
    state::AppState,
};

pub mod download;
pub mod health;
pub mod links;
pub mod origin;

pub use origin::ClientOrigin;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/statements/{statement_id}/links",
            get(links::list_links).post(links::issue_link),
        )
        .route("/links/{link_id}/revoke", post(links::revoke_link))
        .route("/download/{token}", get(download::download))
        .route("/download/{token}/info", get(links::get_link));

    Router::new()
        .nest("/v1", v1_routes)
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        links::issue_link,
        links::list_links,
        links::revoke_link,
        links::get_link,
        download::download,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            LinkResponse,
            LinkStatus,
            IssueLinkRequest,
            RevokeLinkRequest,
            ErrorBody,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Links", description = "Download link issuance and revocation (staff)"),
        (name = "Download", description = "Anonymous token-based statement download"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
