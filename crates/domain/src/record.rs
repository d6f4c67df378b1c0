use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const DEFAULT_ACTION: &str = "UNKNOWN";
const DEFAULT_ACTOR: &str = "Unknown User";
const DEFAULT_ORIGIN: &str = "Unknown";

/// One `{name, value}` pair from an upstream `elements` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditElement {
    /// Element name, matched case-sensitively.
    pub name: String,
    /// Element value.
    pub value: String,
}

/// Canonical audit entry shown by every view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Action label.
    pub action: String,
    /// User who performed the action.
    pub actor: String,
    /// Emitting subsystem.
    pub origin: String,
    /// Event time as sent upstream.
    pub timestamp: String,
    /// Called API path.
    pub api_path: String,
    /// Operation label.
    pub operation: String,
    /// Affected entity name.
    pub entity_name: String,
    /// Page or route the user navigated to.
    pub navigated_to: String,
    /// HTTP method of the audited call.
    pub http_method: String,
    /// Upstream elements kept for detail views.
    pub raw_elements: Vec<AuditElement>,
}

/// Returns the value of the first element named `name`, or `""`.
#[must_use]
pub fn element_value<'a>(elements: &'a [AuditElement], name: &str) -> &'a str {
    elements
        .iter()
        .find(|element| element.name == name)
        .map_or("", |element| element.value.as_str())
}

/// Maps raw upstream items into canonical records.
///
/// `now` stands in for items that carry no timestamp at all.
#[must_use]
pub fn normalize_records(raw: &[Value], now: DateTime<Utc>) -> Vec<AuditRecord> {
    let fallback_timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    raw.iter()
        .map(|item| AuditRecord::from_upstream(item, fallback_timestamp.as_str()))
        .collect()
}

impl AuditRecord {
    fn from_upstream(item: &Value, fallback_timestamp: &str) -> Self {
        let empty = Map::new();
        let object = item.as_object().unwrap_or(&empty);
        let raw_elements = parse_elements(object.get("elements"));
        let source = UpstreamItem {
            object,
            elements: &raw_elements,
        };

        Self {
            action: source.resolve(&["action"], &["action"], DEFAULT_ACTION),
            actor: source.resolve(&["actor"], &["actor"], DEFAULT_ACTOR),
            origin: source.resolve(&["origin"], &["origin"], DEFAULT_ORIGIN),
            timestamp: source.resolve(&["timestamp"], &["timestamp"], fallback_timestamp),
            api_path: source.resolve(&["apiPath", "APIPath"], &["path"], ""),
            operation: source.resolve(&["operation"], &["operation"], ""),
            entity_name: source.resolve(&["entityName"], &["entityName"], ""),
            navigated_to: source.resolve(
                &["navigatedTo"],
                &["page", "urlAfterRedirects", "entityName"],
                "",
            ),
            http_method: source.resolve(&["httpMethod"], &["httpMethod"], ""),
            raw_elements,
        }
    }
}

struct UpstreamItem<'a> {
    object: &'a Map<String, Value>,
    elements: &'a [AuditElement],
}

impl UpstreamItem<'_> {
    /// Flat keys win over element lookups; the first non-empty value is used.
    fn resolve(&self, flat_keys: &[&str], element_names: &[&str], default: &str) -> String {
        flat_keys
            .iter()
            .find_map(|key| self.object.get(*key).and_then(scalar_text))
            .or_else(|| {
                element_names
                    .iter()
                    .map(|name| element_value(self.elements, name))
                    .find(|value| !value.is_empty())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| default.to_owned())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn parse_elements(value: Option<&Value>) -> Vec<AuditElement> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name").and_then(Value::as_str)?;
            let value = entry.get("value").and_then(scalar_text).unwrap_or_default();
            Some(AuditElement {
                name: name.to_owned(),
                value,
            })
        })
        .collect()
}
