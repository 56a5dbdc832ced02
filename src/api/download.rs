// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use super::origin::ClientOrigin;
use crate::{
    error::{ApiError, ErrorBody},
    state::AppState,
};

/// `attachment; filename="..."` with quotes, backslashes and non-ASCII
/// characters replaced.
fn content_disposition(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Download a statement with its token. Each success consumes one access.
#[utoipa::path(
    get,
    path = "/v1/download/{token}",
    params(("token" = String, Path, description = "Download token")),
    tag = "Download",
    responses(
        (status = 200, description = "Decrypted statement bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown, revoked or exhausted link", body = ErrorBody),
        (status = 410, description = "Link expired", body = ErrorBody),
        (status = 500, description = "Stored file unavailable", body = ErrorBody)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ClientOrigin(origin): ClientOrigin,
) -> Result<Response, ApiError> {
    let file = state.delivery.download(&token, &origin).await?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.content_type)),
            (header::CONTENT_DISPOSITION, content_disposition(&file.file_name)),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        file.bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_escapes_unsafe_characters() {
        assert_eq!(
            content_disposition("march 2026.pdf"),
            "attachment; filename=\"march 2026.pdf\""
        );
        assert_eq!(
            content_disposition("a\"b\\c\r\n.pdf"),
            "attachment; filename=\"a_b_c__.pdf\""
        );
        assert_eq!(
            content_disposition("relevé.pdf"),
            "attachment; filename=\"relev_.pdf\""
        );
    }
}
