//! Wire layer: sends an `ApiRequest` and hands back the raw status and body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ApiError, ApiRequest, Result};

/// Status and body of a completed HTTP exchange, successful or not.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-success status into the matching `ApiError`.
    pub fn check(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.body))
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }
}

/// Something that can put a request on the wire.
///
/// Only transport failures are errors here; every HTTP status comes back as
/// a `RawResponse` so the pipeline can decide what it means.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse>;
}

/// `Transport` backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse> {
        let url = self.url(&request.path);
        debug!(method = %request.method, url = %url, retried = request.retried, "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(url = %url, status, "Received response");

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let transport = HttpTransport::new("http://localhost:8080/api/v1/", Duration::from_secs(1))
            .expect("client builds");
        assert_eq!(transport.url("/auth/login"), "http://localhost:8080/api/v1/auth/login");
        assert_eq!(transport.url("users/3"), "http://localhost:8080/api/v1/users/3");
    }

    #[test]
    fn test_raw_response_check() {
        assert!(RawResponse::new(204, "").check().is_ok());
        let err = RawResponse::new(401, r#"{"error":"Invalid or expired token"}"#)
            .check()
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.server_message(), Some("Invalid or expired token"));
    }

    #[test]
    fn test_raw_response_json_error() {
        let err = RawResponse::new(200, "not json").json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
