// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Readiness response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Data directory write-read-delete probe.
    pub data_dir: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 503 when the data directory cannot be written.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let data_dir = match state.storage.health_check() {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::error!(error = %e, "Data directory health check failed");
            "unavailable".to_string()
        }
    };
    let all_ok = data_dir == "ok";

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            data_dir,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::test_state;

    #[tokio::test]
    async fn liveness_is_ok() {
        let Json(response) = liveness().await;
        assert_eq!(response.status, "ok");
    }

    #[tokio::test]
    async fn ready_with_writable_data_dir() {
        let (state, _temp_dir) = test_state();
        let (status, Json(response)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.checks.data_dir, "ok");
    }

    #[tokio::test]
    async fn degraded_when_data_dir_is_gone() {
        let (state, temp_dir) = test_state();
        std::fs::remove_dir_all(temp_dir.path()).unwrap();

        let (status, Json(response)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.status, "degraded");
    }
}
