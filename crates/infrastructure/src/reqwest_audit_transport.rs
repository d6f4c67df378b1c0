use std::time::Duration;

use async_trait::async_trait;
use auditlens_application::{AuditTransport, TransportError, TransportErrorKind};
use auditlens_core::{AppError, AppResult};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// HTTP implementation of the audit transport port.
#[derive(Clone)]
pub struct ReqwestAuditTransport {
    http_client: reqwest::Client,
}

impl ReqwestAuditTransport {
    /// Creates a transport over an existing client.
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Creates a transport with its own client.
    ///
    /// `accept_invalid_certs` exists for local services with self-signed
    /// certificates.
    pub fn with_options(timeout: Duration, accept_invalid_certs: bool) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build audit HTTP client: {error}"))
            })?;

        Ok(Self::new(http_client))
    }
}

#[async_trait]
impl AuditTransport for ReqwestAuditTransport {
    async fn get_json(&self, url: &Url) -> Result<Value, TransportError> {
        let response = self
            .http_client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| {
                TransportError::new(url, TransportErrorKind::Network(error.to_string()))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(
                url,
                TransportErrorKind::Status(status.as_u16()),
            ));
        }

        let body = response.bytes().await.map_err(|error| {
            TransportError::new(url, TransportErrorKind::Network(error.to_string()))
        })?;
        debug!(url = %url, bytes = body.len(), "audit response received");

        serde_json::from_slice(&body)
            .map_err(|error| TransportError::new(url, TransportErrorKind::Decode(error.to_string())))
    }
}
