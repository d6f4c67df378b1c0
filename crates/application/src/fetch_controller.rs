use std::sync::Arc;

use auditlens_core::{AppError, AppResult};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::endpoint_resolver::EndpointResolver;
use crate::transport_ports::{AuditTransport, TransportError};
use crate::view_config::ViewConfig;

/// Resource that lists known entity names.
pub const ENTITY_CATALOG_RESOURCE: &str = "audit/entities";

/// One page of a result sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    offset: usize,
    limit: usize,
    query: String,
}

impl PageRequest {
    /// Creates a page request; a zero limit is raised to one.
    #[must_use]
    pub fn new(offset: usize, limit: usize, query: impl Into<String>) -> Self {
        Self {
            offset,
            limit: limit.max(1),
            query: query.into(),
        }
    }

    /// Returns records to skip.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the requested page size.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the rendered `search` value, possibly empty.
    #[must_use]
    pub fn query(&self) -> &str {
        self.query.as_str()
    }

    fn apply_to(&self, base: &Url) -> Url {
        let mut url = base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("offset", self.offset.to_string().as_str())
                .append_pair("limit", self.limit.to_string().as_str());
            if !self.query.is_empty() {
                pairs.append_pair("search", self.query.as_str());
            }
        }
        url
    }
}

/// Upstream records exactly as received, not yet normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage(Vec<Value>);

impl RawPage {
    fn from_payload(resource: &str, payload: Value) -> Self {
        match payload {
            Value::Array(items) => Self(items),
            other => {
                warn!(
                    resource,
                    payload_kind = json_kind(&other),
                    "non-array payload treated as empty page"
                );
                Self::default()
            }
        }
    }

    /// Returns the raw items.
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.0
    }

    /// Returns the number of raw items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Failure of a fetch after failover.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Primary and fallback both failed.
    #[error("both endpoints unreachable: primary {primary}; fallback {fallback}")]
    BothEndpointsUnreachable {
        /// Primary failure.
        primary: TransportError,
        /// Fallback failure.
        fallback: TransportError,
    },

    /// The resource name could not be turned into addresses.
    #[error("cannot resolve resource '{resource}': {reason}")]
    Unresolvable {
        /// Requested resource.
        resource: String,
        /// Resolver message.
        reason: String,
    },

    /// The task running the fetch ended without a result.
    #[error("fetch interrupted: {0}")]
    Interrupted(String),
}

impl From<FetchError> for AppError {
    fn from(error: FetchError) -> Self {
        AppError::Unavailable(error.to_string())
    }
}

/// Issues page requests with a single primary-to-fallback failover.
///
/// Holds no per-view state and can be shared between views.
#[derive(Clone)]
pub struct PagedFetchController {
    transport: Arc<dyn AuditTransport>,
    resolver: EndpointResolver,
    default_entities: Vec<String>,
}

impl PagedFetchController {
    /// Creates a controller.
    #[must_use]
    pub fn new(
        transport: Arc<dyn AuditTransport>,
        resolver: EndpointResolver,
        default_entities: Vec<String>,
    ) -> Self {
        Self {
            transport,
            resolver,
            default_entities,
        }
    }

    /// Creates a controller from view configuration.
    pub fn from_config(transport: Arc<dyn AuditTransport>, config: &ViewConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self::new(
            transport,
            EndpointResolver::from_config(config)?,
            config.default_entities.clone(),
        ))
    }

    /// Returns the endpoint resolver.
    #[must_use]
    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// Fetches one page of `resource`.
    ///
    /// Non-array payloads yield an empty page instead of an error.
    pub async fn fetch_page(
        &self,
        resource: &str,
        request: &PageRequest,
    ) -> Result<RawPage, FetchError> {
        let endpoints = self
            .resolver
            .resolve(resource)
            .map_err(|error| FetchError::Unresolvable {
                resource: resource.to_owned(),
                reason: error.to_string(),
            })?;

        debug!(
            resource,
            offset = request.offset(),
            limit = request.limit(),
            search = request.query(),
            "fetching audit page"
        );

        let payload = self
            .get_with_failover(
                resource,
                &request.apply_to(&endpoints.primary),
                &request.apply_to(&endpoints.fallback),
            )
            .await?;

        Ok(RawPage::from_payload(resource, payload))
    }

    /// Loads entity names for filter suggestions.
    ///
    /// Falls back to the configured defaults when neither endpoint answers.
    pub async fn fetch_entity_names(&self) -> Vec<String> {
        let endpoints = match self.resolver.resolve(ENTITY_CATALOG_RESOURCE) {
            Ok(endpoints) => endpoints,
            Err(error) => {
                warn!(error = %error, "entity catalog address unavailable, using defaults");
                return self.default_entities.clone();
            }
        };

        match self
            .get_with_failover(
                ENTITY_CATALOG_RESOURCE,
                &endpoints.primary,
                &endpoints.fallback,
            )
            .await
        {
            Ok(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    _ => None,
                })
                .collect(),
            Ok(other) => {
                warn!(
                    payload_kind = json_kind(&other),
                    "non-array entity catalog treated as empty"
                );
                Vec::new()
            }
            Err(error) => {
                warn!(error = %error, "entity catalog unreachable, using defaults");
                self.default_entities.clone()
            }
        }
    }

    async fn get_with_failover(
        &self,
        resource: &str,
        primary: &Url,
        fallback: &Url,
    ) -> Result<Value, FetchError> {
        let primary_error = match self.transport.get_json(primary).await {
            Ok(payload) => return Ok(payload),
            Err(error) => error,
        };

        warn!(
            resource,
            url = %primary,
            error = %primary_error,
            "primary endpoint failed, trying fallback"
        );

        match self.transport.get_json(fallback).await {
            Ok(payload) => {
                info!(resource, url = %fallback, "fallback endpoint answered");
                Ok(payload)
            }
            Err(fallback_error) => {
                warn!(
                    resource,
                    url = %fallback,
                    error = %fallback_error,
                    "fallback endpoint failed"
                );
                Err(FetchError::BothEndpointsUnreachable {
                    primary: primary_error,
                    fallback: fallback_error,
                })
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
