// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Minimal unary RPC client for the argumentation services.
//!
//! Speaks the Connect protocol with JSON payloads:
//! `POST {base}/{package.Service}/{Method}` with an `application/json` body.
//! Errors come back as `{"code": "...", "message": "..."}`.

use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROTOCOL_VERSION_HEADER: &str = "Connect-Protocol-Version";

/// Client bound to one service of one server.
#[derive(Clone)]
pub struct ConnectClient {
    http: reqwest::Client,
    base_url: String,
    service: &'static str,
    label: &'static str,
}

/// Error body returned by Connect servers.
#[derive(Debug, Deserialize)]
struct ConnectErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl ConnectClient {
    /// Create a client for `service` (fully qualified, e.g.
    /// `arg_services.cbr.v1beta.RetrievalService`) at `address`.
    /// `label` names the service in errors and logs.
    pub fn new(
        address: &str,
        service: &'static str,
        label: &'static str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url(address),
            service,
            label,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call `method` with `request` and decode the response.
    pub async fn unary<Req, Res>(&self, method: &str, request: &Req) -> Result<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let url = format!("{}/{}/{}", self.base_url, self.service, method);
        tracing::debug!(service = self.label, %url, "Calling service");

        let response = self
            .http
            .post(&url)
            .header(PROTOCOL_VERSION_HEADER, "1")
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, &body));
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| AppError::Service {
            service: self.label,
            code: AppError::INVALID_RESPONSE.to_string(),
            message: e.to_string(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> AppError {
        let code = if err.is_timeout() {
            AppError::DEADLINE_EXCEEDED
        } else {
            AppError::UNAVAILABLE
        };

        tracing::warn!(service = self.label, error = %err, "Service call failed");
        AppError::Service {
            service: self.label,
            code: code.to_string(),
            message: err.to_string(),
        }
    }

    fn status_error(&self, status: reqwest::StatusCode, body: &str) -> AppError {
        match serde_json::from_str::<ConnectErrorBody>(body) {
            Ok(error) if !error.code.is_empty() => AppError::Service {
                service: self.label,
                code: error.code,
                message: error.message,
            },
            _ => AppError::Service {
                service: self.label,
                code: status_code_name(status).to_string(),
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }
}

/// Prefix bare `host:port` addresses with `http://`.
fn base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

/// Connect code for an HTTP status without an error body.
fn status_code_name(status: reqwest::StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "invalid_argument",
        401 => "unauthenticated",
        403 => "permission_denied",
        404 => "unimplemented",
        429 | 502 | 503 | 504 => AppError::UNAVAILABLE,
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_adds_scheme() {
        assert_eq!(base_url("127.0.0.1:50200"), "http://127.0.0.1:50200");
        assert_eq!(base_url("https://cbr.example.org/"), "https://cbr.example.org");
    }

    #[test]
    fn test_status_error_uses_connect_body() {
        let client = ConnectClient::new(
            "localhost:1",
            "pkg.Service",
            "retrieval",
            Duration::from_secs(1),
        )
        .unwrap();
        let err = client.status_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"code": "invalid_argument", "message": "no cases"}"#,
        );
        assert_eq!(
            err.to_string(),
            "retrieval service error (invalid_argument): no cases"
        );
    }

    #[test]
    fn test_status_error_without_body() {
        let client = ConnectClient::new(
            "localhost:1",
            "pkg.Service",
            "adaptation",
            Duration::from_secs(1),
        )
        .unwrap();
        let err = client.status_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(err.is_unavailable());
    }
}
