use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Why a single endpoint could not answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection, TLS or timeout failure.
    Network(String),
    /// Non-success HTTP status.
    Status(u16),
    /// Body was not valid JSON.
    Decode(String),
}

/// Failure of one request against one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request to {url} failed: {kind}")]
pub struct TransportError {
    /// Requested address.
    pub url: String,
    /// Failure category.
    pub kind: TransportErrorKind,
}

impl TransportError {
    /// Creates an error for the given address.
    #[must_use]
    pub fn new(url: &Url, kind: TransportErrorKind) -> Self {
        Self {
            url: url.to_string(),
            kind,
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(formatter, "network error: {message}"),
            Self::Status(status) => write!(formatter, "status {status}"),
            Self::Decode(message) => write!(formatter, "undecodable body: {message}"),
        }
    }
}

/// Port for issuing read requests to the audit service.
#[async_trait]
pub trait AuditTransport: Send + Sync {
    /// Issues one GET request and returns the decoded JSON body.
    async fn get_json(&self, url: &Url) -> Result<Value, TransportError>;
}
