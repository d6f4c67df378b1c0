use auditlens_core::{AppError, AppResult, NonEmptyString};
use url::Url;

use crate::view_config::{DEFAULT_FALLBACK_ADDRESS, DEFAULT_PRIMARY_ADDRESS, ViewConfig};

/// Addresses for one logical resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoints {
    /// Address tried first.
    pub primary: Url,
    /// Address tried once after the primary fails.
    pub fallback: Url,
}

/// Maps resource names onto primary and fallback addresses.
///
/// Resolution never checks reachability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    primary_base: Url,
    fallback_base: Url,
}

impl EndpointResolver {
    /// Creates a resolver, filling absent addresses with the local defaults.
    pub fn new(primary: Option<Url>, fallback: Option<Url>) -> AppResult<Self> {
        let primary_base = match primary {
            Some(url) => url,
            None => parse_default(DEFAULT_PRIMARY_ADDRESS)?,
        };
        let fallback_base = match fallback {
            Some(url) => url,
            None => parse_default(DEFAULT_FALLBACK_ADDRESS)?,
        };

        for base in [&primary_base, &fallback_base] {
            if base.cannot_be_a_base() {
                return Err(AppError::Validation(format!(
                    "address '{base}' cannot be used as a base address"
                )));
            }
        }

        Ok(Self {
            primary_base,
            fallback_base,
        })
    }

    /// Creates a resolver from view configuration.
    pub fn from_config(config: &ViewConfig) -> AppResult<Self> {
        Self::new(
            config.primary_address.clone(),
            config.fallback_address.clone(),
        )
    }

    /// Returns the primary base address.
    #[must_use]
    pub fn primary_base(&self) -> &Url {
        &self.primary_base
    }

    /// Returns the fallback base address.
    #[must_use]
    pub fn fallback_base(&self) -> &Url {
        &self.fallback_base
    }

    /// Resolves a resource path such as `audit` or `audit/entities`.
    pub fn resolve(&self, resource: &str) -> AppResult<ResolvedEndpoints> {
        let resource = NonEmptyString::new(resource)?;

        Ok(ResolvedEndpoints {
            primary: resource_url(&self.primary_base, resource.as_str())?,
            fallback: resource_url(&self.fallback_base, resource.as_str())?,
        })
    }
}

fn parse_default(address: &str) -> AppResult<Url> {
    Url::parse(address).map_err(|error| {
        AppError::Internal(format!("invalid built-in address '{address}': {error}"))
    })
}

fn resource_url(base: &Url, resource: &str) -> AppResult<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);

    {
        let mut segments = url.path_segments_mut().map_err(|()| {
            AppError::Validation(format!("address '{base}' cannot be used as a base address"))
        })?;
        segments.pop_if_empty();
        for segment in resource.split('/').filter(|segment| !segment.is_empty()) {
            segments.push(segment);
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::EndpointResolver;

    fn url(value: &str) -> Url {
        Url::parse(value).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn defaults_point_at_local_service() {
        let resolver = EndpointResolver::new(None, None).unwrap_or_else(|_| unreachable!());
        let endpoints = resolver.resolve("audit").unwrap_or_else(|_| unreachable!());

        assert_eq!(endpoints.primary.as_str(), "https://localhost:5555/audit");
        assert_eq!(endpoints.fallback.as_str(), "https://127.0.0.1:5555/audit");
    }

    #[test]
    fn configured_primary_keeps_its_path_prefix() {
        let resolver = EndpointResolver::new(Some(url("http://audit.internal:8080/api/")), None)
            .unwrap_or_else(|_| unreachable!());
        let endpoints = resolver
            .resolve("audit/entities")
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(
            endpoints.primary.as_str(),
            "http://audit.internal:8080/api/audit/entities"
        );
        assert_eq!(
            endpoints.fallback.as_str(),
            "https://127.0.0.1:5555/audit/entities"
        );
    }

    #[test]
    fn empty_resource_is_rejected() {
        let resolver = EndpointResolver::new(None, None).unwrap_or_else(|_| unreachable!());
        assert!(resolver.resolve("  ").is_err());
    }

    #[test]
    fn opaque_base_is_rejected() {
        assert!(EndpointResolver::new(Some(url("mailto:ops@example.com")), None).is_err());
    }
}
