// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::delivery::DeliveryError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

/// JSON error body returned by every endpoint.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message.
    error: String,
    /// Stable machine-readable code.
    error_code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error",
        )
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        match &err {
            DeliveryError::Validation(msg) => Self::bad_request(msg.clone()),
            DeliveryError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            DeliveryError::LinkRevoked => {
                Self::new(StatusCode::NOT_FOUND, "link_revoked", err.to_string())
            }
            DeliveryError::AccessLimitReached => {
                Self::new(StatusCode::NOT_FOUND, "access_limit_reached", err.to_string())
            }
            DeliveryError::LinkExpired => {
                Self::new(StatusCode::GONE, "link_expired", err.to_string())
            }
            DeliveryError::Cipher(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "file_unavailable",
                "the requested file is unavailable",
            ),
            DeliveryError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code.to_string(),
        });
        (self.status, body).into_response()
    }
}
