use std::env;
use std::str::FromStr;
use std::time::Duration;

use auditlens_application::{
    DEFAULT_PAGE_SIZE, DEFAULT_SCROLL_INTERVAL, DEFAULT_SCROLL_THRESHOLD_PX, ViewConfig,
};
use auditlens_core::{AppError, AppResult};
use auditlens_domain::{ClauseStyle, OperatorDialect, QueryOperator, ResourceProfile};
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_RESOURCE: &str = "audit";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub view: ViewConfig,
    pub resource: String,
    pub scalar_operator: QueryOperator,
    pub dialect: OperatorDialect,
    pub clause_style: ClauseStyle,
    pub http_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl ViewerConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let env = EnvReader { lookup };

        let primary_address = env.optional_url("AUDITLENS_PRIMARY_URL")?;
        let fallback_address = env.optional_url("AUDITLENS_FALLBACK_URL")?;
        let resource = env
            .non_empty("AUDITLENS_RESOURCE")
            .unwrap_or_else(|| DEFAULT_RESOURCE.to_owned());
        let scalar_operator = env.parse("AUDITLENS_OPERATOR", QueryOperator::Contains)?;
        if !matches!(scalar_operator, QueryOperator::Contains | QueryOperator::Equals) {
            return Err(AppError::Validation(format!(
                "AUDITLENS_OPERATOR must be 'contains' or 'equals', got '{}'",
                scalar_operator.as_str()
            )));
        }
        let dialect = env.parse("AUDITLENS_DIALECT", OperatorDialect::STANDARD)?;
        let clause_style = env.parse(
            "AUDITLENS_CLAUSE_STYLE",
            ClauseStyle::for_resource(resource.as_str()),
        )?;
        let page_size = env.parse("AUDITLENS_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let scroll_threshold_px =
            env.parse("AUDITLENS_SCROLL_THRESHOLD_PX", DEFAULT_SCROLL_THRESHOLD_PX)?;
        let scroll_interval_ms = env.parse(
            "AUDITLENS_SCROLL_INTERVAL_MS",
            u64::try_from(DEFAULT_SCROLL_INTERVAL.as_millis()).unwrap_or(u64::MAX),
        )?;
        let http_timeout_secs =
            env.parse("AUDITLENS_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let accept_invalid_certs = env.flag("AUDITLENS_ACCEPT_INVALID_CERTS", false)?;

        let mut view = ViewConfig {
            primary_address,
            fallback_address,
            page_size,
            scroll_threshold_px,
            scroll_interval: Duration::from_millis(scroll_interval_ms),
            ..ViewConfig::default()
        };
        if let Some(entities) = env.non_empty("AUDITLENS_DEFAULT_ENTITIES") {
            view.default_entities = entities
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
                .collect();
        }
        view.validate()?;

        if http_timeout_secs == 0 {
            return Err(AppError::Validation(
                "AUDITLENS_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        let config = Self {
            view,
            resource,
            scalar_operator,
            dialect,
            clause_style,
            http_timeout: Duration::from_secs(http_timeout_secs),
            accept_invalid_certs,
        };
        config.profile()?;

        Ok(config)
    }

    pub fn profile(&self) -> AppResult<ResourceProfile> {
        Ok(
            ResourceProfile::new(self.resource.as_str(), self.scalar_operator, self.dialect)?
                .with_clause_style(self.clause_style),
        )
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn non_empty(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn parse<T>(&self, name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.non_empty(name) {
            Some(value) => value.parse::<T>().map_err(|error| {
                AppError::Validation(format!("invalid {name} value '{value}': {error}"))
            }),
            None => Ok(default),
        }
    }

    fn optional_url(&self, name: &str) -> AppResult<Option<Url>> {
        self.non_empty(name)
            .map(|value| {
                Url::parse(value.as_str()).map_err(|error| {
                    AppError::Validation(format!("invalid {name} value '{value}': {error}"))
                })
            })
            .transpose()
    }

    fn flag(&self, name: &str, default: bool) -> AppResult<bool> {
        match self.non_empty(name).as_deref() {
            None => Ok(default),
            Some("1" | "true" | "yes") => Ok(true),
            Some("0" | "false" | "no") => Ok(false),
            Some(value) => Err(AppError::Validation(format!(
                "invalid {name} value '{value}': expected true or false"
            ))),
        }
    }
}
