//! The output record shared by both extraction paths

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// Projected from a structured API response
    Api,
    /// Mined from rendered markup
    Heuristic,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single extracted ad
///
/// Fields never hold `null`: [`Record::set`] drops nulls, so a field is either
/// present with a concrete value or absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Deduplication key for the current run
    #[serde(rename = "id")]
    pub identity: String,

    pub source: SourceTag,

    #[serde(rename = "scraped_at")]
    pub captured_at: DateTime<Utc>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Creates a record with no fields, stamped with the current time
    pub fn new(identity: impl Into<String>, source: SourceTag) -> Self {
        Self::captured(identity, source, Utc::now())
    }

    /// Creates a record with an explicit capture timestamp
    pub fn captured(
        identity: impl Into<String>,
        source: SourceTag,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity: identity.into(),
            source,
            captured_at,
            fields: Map::new(),
        }
    }

    /// Sets a field, ignoring `null`
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        if value.is_null() {
            return;
        }
        self.fields.insert(name.to_string(), value);
    }

    /// Sets a text field, storing `""` when the value is absent
    pub fn set_text(&mut self, name: &str, value: Option<&str>) {
        self.fields.insert(
            name.to_string(),
            Value::String(value.unwrap_or_default().to_string()),
        );
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns a field as a string slice, if it is a string
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
