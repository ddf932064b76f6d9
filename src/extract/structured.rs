//! Projection of structured API responses
//!
//! The ads archive answers with `{"data": [...], "paging": {"next": "..."}}`.
//! Each entry of `data` becomes one [`Record`] with a fixed field set.

use super::identity::hashed_identity;
use crate::record::{Record, SourceTag};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Scalar fields copied as-is, omitted when absent
const SCALAR_FIELDS: &[&str] = &[
    "page_id",
    "page_name",
    "ad_creation_time",
    "ad_delivery_start_time",
    "ad_delivery_stop_time",
    "ad_snapshot_url",
    "currency",
    "funding_entity",
];

/// Range objects (`lower_bound`/`upper_bound`), defaulting to `{}`
const RANGE_FIELDS: &[&str] = &["impressions", "spend"];

/// List fields, defaulting to `[]`
const LIST_FIELDS: &[&str] = &["demographic_distribution", "publisher_platforms"];

/// Multi-valued creative fields and the single-valued name they project to
const CREATIVE_FIELDS: &[(&str, &str)] = &[
    ("ad_creative_bodies", "ad_creative_body"),
    ("ad_creative_link_captions", "ad_creative_link_caption"),
    ("ad_creative_link_descriptions", "ad_creative_link_description"),
    ("ad_creative_link_titles", "ad_creative_link_title"),
];

#[derive(Debug, Default, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<String>,
}

/// One page of an API response
#[derive(Debug, Default, Deserialize)]
pub struct ApiPage {
    /// `None` when the response carried no `data` key at all
    #[serde(default)]
    pub data: Option<Vec<Value>>,

    #[serde(default)]
    paging: Option<Paging>,
}

impl ApiPage {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// The `paging.next` URL, if any
    pub fn next_url(&self) -> Option<&str> {
        self.paging.as_ref()?.next.as_deref()
    }
}

/// Projects one API entry into a record
pub fn project_api_record(entry: &Value) -> Record {
    let empty = Map::new();
    let object = entry.as_object().unwrap_or(&empty);

    let identity = match object.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => hashed_identity(&entry.to_string()),
    };

    let mut record = Record::new(identity.clone(), SourceTag::Api);
    record.set("ad_id", identity);

    for field in SCALAR_FIELDS {
        if let Some(value) = object.get(*field) {
            record.set(field, value.clone());
        }
    }

    for field in RANGE_FIELDS {
        let value = object
            .get(*field)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        record.set(field, value);
    }

    for field in LIST_FIELDS {
        let value = object
            .get(*field)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        record.set(field, value);
    }

    for (source, target) in CREATIVE_FIELDS {
        record.set_text(target, first_text(object.get(*source)));
    }

    record
}

/// First element of a multi-valued field, as text
fn first_text(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::Array(items) => items.first().and_then(Value::as_str),
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}
