// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Network origin of a request, for the audit trail.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};

use crate::delivery::audit::UNKNOWN_ORIGIN;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// First `X-Forwarded-For` hop, else the peer IP, else `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOrigin(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());

        if let Some(hop) = forwarded {
            return Ok(ClientOrigin(hop.to_string()));
        }

        let origin = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string());
        Ok(ClientOrigin(origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn origin_of(request: Request<()>) -> String {
        let mut parts = request.into_parts().0;
        let ClientOrigin(origin) = ClientOrigin::from_request_parts(&mut parts, &()).await.unwrap();
        origin
    }

    #[tokio::test]
    async fn prefers_first_forwarded_hop() {
        let request = Request::builder()
            .header("X-Forwarded-For", " 203.0.113.7 , 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(origin_of(request).await, "203.0.113.7");
    }

    #[tokio::test]
    async fn falls_back_to_peer_address() {
        let mut request = Request::builder().body(()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 55_000))));
        assert_eq!(origin_of(request).await, "192.0.2.4");
    }

    #[tokio::test]
    async fn unknown_without_either() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(origin_of(request).await, UNKNOWN_ORIGIN);
    }
}
