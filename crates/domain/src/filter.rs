use std::str::FromStr;

use auditlens_core::{AppError, AppResult, NonEmptyString};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Wire name of the actor dimension.
pub const ACTOR_FIELD: &str = "actor";
/// Wire name of the API path dimension.
pub const API_PATH_FIELD: &str = "path";
/// Wire name of the operation dimension.
pub const OPERATION_FIELD: &str = "operation";
/// Wire name of the entity dimension.
pub const ENTITY_NAME_FIELD: &str = "entityName";
/// Wire name of the event time range dimension.
pub const EVENT_TIME_FIELD: &str = "eventTime";
/// Wire name of the change author in plain clauses.
pub const AUTHOR_FIELD: &str = "author";
/// Wire name of the lower time bound in plain clauses.
pub const FROM_FIELD: &str = "from";
/// Wire name of the upper time bound in plain clauses.
pub const TO_FIELD: &str = "to";
/// Resource that renders plain clauses unless configured otherwise.
pub const ENTITY_HISTORY_RESOURCE: &str = "entity-history";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const CLAUSE_SEPARATOR: &str = ";";

/// Comparison operator for one query clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOperator {
    /// Substring match.
    Contains,
    /// Exact match.
    Equals,
    /// Inclusive bounds, either side may be open.
    Range,
    /// Negated exact match.
    NotEqual,
}

impl QueryOperator {
    /// Returns stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::Range => "range",
            Self::NotEqual => "not_equal",
        }
    }
}

impl FromStr for QueryOperator {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "contains" => Ok(Self::Contains),
            "equals" => Ok(Self::Equals),
            "range" => Ok(Self::Range),
            "not_equal" => Ok(Self::NotEqual),
            _ => Err(AppError::Validation(format!(
                "unknown query operator '{value}'"
            ))),
        }
    }
}

/// Tokens written between brackets for each operator.
///
/// Upstream services disagree on spelling (`contains` vs `like`, `equals`
/// vs `eq`), so the token set is chosen per resource instead of per view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorDialect {
    contains: &'static str,
    equals: &'static str,
    range: &'static str,
    not_equal: &'static str,
}

impl OperatorDialect {
    /// `contains`, `equals`, `range`, `notEqual`.
    pub const STANDARD: Self = Self {
        contains: "contains",
        equals: "equals",
        range: "range",
        not_equal: "notEqual",
    };

    /// `like`, `eq`, `range`, `notEqual`.
    pub const LIKE: Self = Self {
        contains: "like",
        equals: "eq",
        range: "range",
        not_equal: "notEqual",
    };

    /// `eq` for both substring and exact matches.
    pub const EQ: Self = Self {
        contains: "eq",
        equals: "eq",
        range: "range",
        not_equal: "notEqual",
    };

    /// Returns the bracket token for an operator.
    #[must_use]
    pub fn token(&self, operator: QueryOperator) -> &'static str {
        match operator {
            QueryOperator::Contains => self.contains,
            QueryOperator::Equals => self.equals,
            QueryOperator::Range => self.range,
            QueryOperator::NotEqual => self.not_equal,
        }
    }
}

impl Default for OperatorDialect {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl FromStr for OperatorDialect {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "standard" => Ok(Self::STANDARD),
            "like" => Ok(Self::LIKE),
            "eq" => Ok(Self::EQ),
            _ => Err(AppError::Validation(format!(
                "unknown operator dialect '{value}', expected 'standard', 'like' or 'eq'"
            ))),
        }
    }
}

/// Shape of the clauses a resource understands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseStyle {
    /// `actor[contains]=a;eventTime[range]=from,to` over all dimensions.
    #[default]
    Bracketed,
    /// `author=a;from=..;to=..`; the entity narrows the resource path instead
    /// of producing a clause.
    Plain,
}

impl ClauseStyle {
    /// Returns stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bracketed => "bracketed",
            Self::Plain => "plain",
        }
    }

    /// Returns the style a resource uses when none is configured.
    #[must_use]
    pub fn for_resource(resource: &str) -> Self {
        if resource.trim_matches('/') == ENTITY_HISTORY_RESOURCE {
            Self::Plain
        } else {
            Self::Bracketed
        }
    }
}

impl FromStr for ClauseStyle {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bracketed" => Ok(Self::Bracketed),
            "plain" => Ok(Self::Plain),
            _ => Err(AppError::Validation(format!(
                "unknown clause style '{value}', expected 'bracketed' or 'plain'"
            ))),
        }
    }
}

/// Value side of a query clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// One literal value.
    Single(String),
    /// Lower and upper bound; an empty string leaves that side open.
    Range {
        /// Lower bound.
        from: String,
        /// Upper bound.
        to: String,
    },
}

/// One `field[operator]=value` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryField {
    field_name: String,
    operator: QueryOperator,
    value: QueryValue,
}

impl QueryField {
    /// Creates a validated clause.
    ///
    /// The `Range` operator requires a range value and every other operator
    /// requires a single value.
    pub fn new(
        field_name: impl Into<String>,
        operator: QueryOperator,
        value: QueryValue,
    ) -> AppResult<Self> {
        let field_name = NonEmptyString::new(field_name)?;
        let consistent = matches!(
            (operator, &value),
            (QueryOperator::Range, QueryValue::Range { .. })
        ) || !matches!(
            (operator, &value),
            (QueryOperator::Range, _) | (_, QueryValue::Range { .. })
        );
        if !consistent {
            return Err(AppError::Validation(format!(
                "operator '{}' does not accept this value shape for field '{}'",
                operator.as_str(),
                field_name
            )));
        }

        Ok(Self {
            field_name: field_name.into(),
            operator,
            value,
        })
    }

    /// Returns the wire field name.
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.field_name.as_str()
    }

    /// Returns the clause operator.
    #[must_use]
    pub fn operator(&self) -> QueryOperator {
        self.operator
    }

    /// Returns the clause value.
    #[must_use]
    pub fn value(&self) -> &QueryValue {
        &self.value
    }

    /// Renders the clause with the given dialect.
    ///
    /// Separator characters inside values are written verbatim.
    #[must_use]
    pub fn render(&self, dialect: &OperatorDialect) -> String {
        let token = dialect.token(self.operator);
        match &self.value {
            QueryValue::Single(value) => format!("{}[{token}]={value}", self.field_name),
            QueryValue::Range { from, to } => format!("{}[{token}]={from},{to}", self.field_name),
        }
    }

    /// Renders the clause as `name=value`, without an operator token.
    #[must_use]
    pub fn render_plain(&self) -> String {
        match &self.value {
            QueryValue::Single(value) => format!("{}={value}", self.field_name),
            QueryValue::Range { from, to } => format!("{}={from},{to}", self.field_name),
        }
    }
}

/// Per-resource query configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceProfile {
    resource: NonEmptyString,
    scalar_operator: QueryOperator,
    dialect: OperatorDialect,
    clause_style: ClauseStyle,
}

impl ResourceProfile {
    /// Creates a validated profile.
    ///
    /// The clause style defaults to [`ClauseStyle::for_resource`].
    pub fn new(
        resource: impl Into<String>,
        scalar_operator: QueryOperator,
        dialect: OperatorDialect,
    ) -> AppResult<Self> {
        if scalar_operator == QueryOperator::Range {
            return Err(AppError::Validation(
                "range operator cannot be applied to scalar filter fields".to_owned(),
            ));
        }

        let resource = NonEmptyString::new(resource)?;
        Ok(Self {
            clause_style: ClauseStyle::for_resource(resource.as_str()),
            resource,
            scalar_operator,
            dialect,
        })
    }

    /// Overrides the clause style.
    #[must_use]
    pub fn with_clause_style(mut self, clause_style: ClauseStyle) -> Self {
        self.clause_style = clause_style;
        self
    }

    /// Returns the resource path, for example `audit`.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }

    /// Returns the operator used for scalar dimensions.
    #[must_use]
    pub fn scalar_operator(&self) -> QueryOperator {
        self.scalar_operator
    }

    /// Returns the operator token set.
    #[must_use]
    pub fn dialect(&self) -> &OperatorDialect {
        &self.dialect
    }

    /// Returns the clause style.
    #[must_use]
    pub fn clause_style(&self) -> ClauseStyle {
        self.clause_style
    }

    /// Returns the path to fetch for `criteria`.
    ///
    /// Plain resources are narrowed to `{resource}/{entity}` when an entity is
    /// set; bracketed resources filter the entity through a clause instead.
    #[must_use]
    pub fn resource_path(&self, criteria: &FilterCriteria) -> String {
        match (self.clause_style, populated(&criteria.entity_name)) {
            (ClauseStyle::Plain, Some(entity)) => format!(
                "{}/{}",
                self.resource.as_str().trim_end_matches('/'),
                entity.trim()
            ),
            _ => self.resource.as_str().to_owned(),
        }
    }
}

/// Filter values entered for one view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// User who performed the action.
    pub actor: Option<String>,
    /// Called API path.
    pub api_path: Option<String>,
    /// Operation label, for example `CREATE`.
    pub operation: Option<String>,
    /// Affected entity name.
    pub entity_name: Option<String>,
    /// First day of the event time range.
    pub from: Option<NaiveDate>,
    /// Last day of the event time range.
    pub to: Option<NaiveDate>,
}

impl FilterCriteria {
    /// Returns whether no dimension is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        populated(&self.actor).is_none()
            && populated(&self.api_path).is_none()
            && populated(&self.operation).is_none()
            && populated(&self.entity_name).is_none()
            && self.from.is_none()
            && self.to.is_none()
    }
}

fn populated(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|candidate| !candidate.trim().is_empty())
}

/// Expands criteria into clauses in the fixed dimension order.
#[must_use]
pub fn build_query_fields(criteria: &FilterCriteria, profile: &ResourceProfile) -> Vec<QueryField> {
    if profile.clause_style == ClauseStyle::Plain {
        return build_plain_fields(criteria, profile);
    }

    let scalar_dimensions = [
        (ACTOR_FIELD, &criteria.actor),
        (API_PATH_FIELD, &criteria.api_path),
        (OPERATION_FIELD, &criteria.operation),
        (ENTITY_NAME_FIELD, &criteria.entity_name),
    ];

    let mut fields: Vec<QueryField> = scalar_dimensions
        .into_iter()
        .filter_map(|(field_name, value)| {
            populated(value).map(|value| QueryField {
                field_name: field_name.to_owned(),
                operator: profile.scalar_operator,
                value: QueryValue::Single(value.to_owned()),
            })
        })
        .collect();

    if criteria.from.is_some() || criteria.to.is_some() {
        fields.push(QueryField {
            field_name: EVENT_TIME_FIELD.to_owned(),
            operator: QueryOperator::Range,
            value: QueryValue::Range {
                from: format_bound(criteria.from),
                to: format_bound(criteria.to),
            },
        });
    }

    fields
}

fn build_plain_fields(criteria: &FilterCriteria, profile: &ResourceProfile) -> Vec<QueryField> {
    let mut fields = Vec::new();

    if let Some(author) = populated(&criteria.actor) {
        fields.push(QueryField {
            field_name: AUTHOR_FIELD.to_owned(),
            operator: profile.scalar_operator,
            value: QueryValue::Single(author.to_owned()),
        });
    }

    for (field_name, bound) in [(FROM_FIELD, criteria.from), (TO_FIELD, criteria.to)] {
        if let Some(date) = bound {
            fields.push(QueryField {
                field_name: field_name.to_owned(),
                operator: QueryOperator::Equals,
                value: QueryValue::Single(
                    date.and_time(NaiveTime::MIN)
                        .format(TIMESTAMP_FORMAT)
                        .to_string(),
                ),
            });
        }
    }

    fields
}

fn format_bound(bound: Option<NaiveDate>) -> String {
    bound
        .map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Joins rendered clauses with `;`.
#[must_use]
pub fn render_query(fields: &[QueryField], dialect: &OperatorDialect) -> String {
    fields
        .iter()
        .map(|field| field.render(dialect))
        .collect::<Vec<_>>()
        .join(CLAUSE_SEPARATOR)
}

/// Joins plain `name=value` clauses with `;`.
#[must_use]
pub fn render_plain_query(fields: &[QueryField]) -> String {
    fields
        .iter()
        .map(QueryField::render_plain)
        .collect::<Vec<_>>()
        .join(CLAUSE_SEPARATOR)
}

/// Renders criteria into the canonical `search` query string.
#[must_use]
pub fn build_query(criteria: &FilterCriteria, profile: &ResourceProfile) -> String {
    let fields = build_query_fields(criteria, profile);
    match profile.clause_style {
        ClauseStyle::Bracketed => render_query(&fields, profile.dialect()),
        ClauseStyle::Plain => render_plain_query(&fields),
    }
}
