use crate::diary::clock::TimeContext;
use crate::error::DiaryError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Remote,
    Template,
    StaticFallback,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Remote => "remote",
            Tier::Template => "template",
            Tier::StaticFallback => "static_fallback",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "remote" => Some(Tier::Remote),
            "template" => Some(Tier::Template),
            "static_fallback" => Some(Tier::StaticFallback),
            _ => None,
        }
    }
}

/// One diary line as the rest of the crate sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: Option<String>,
    pub author: String,
    pub content: String,
    pub date_key: String,
    pub time: String,
    pub timestamp_ms: i64,
    pub tier: Option<Tier>,
    pub source_id: Option<String>,
}

/// Wire shape of a record under the collection. Every field is optional
/// because older writers only stored `author`, `content` and `dateKey`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

// Browser writers store `Date.now()` which may round-trip as a float or string.
fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

impl Entry {
    pub fn new(time: &TimeContext, author: &str, content: String) -> Self {
        Self {
            id: None,
            author: author.to_string(),
            content,
            date_key: time.date_key.clone(),
            time: time.time.clone(),
            timestamp_ms: time.timestamp_ms,
            tier: None,
            source_id: None,
        }
    }

    pub fn to_record(&self) -> EntryRecord {
        EntryRecord {
            author: Some(self.author.clone()),
            content: Some(self.content.clone()),
            date_key: Some(self.date_key.clone()),
            time: Some(self.time.clone()),
            timestamp_ms: Some(self.timestamp_ms),
            tier: self.tier.map(|t| t.label().to_string()),
            source_id: self.source_id.clone(),
        }
    }

    pub fn from_value(id: &str, value: Value) -> Result<Self, DiaryError> {
        let record: EntryRecord = serde_json::from_value(value)
            .map_err(|err| DiaryError::Parse(format!("record {id}: {err}")))?;
        let date_key = record
            .date_key
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| DiaryError::Parse(format!("record {id}: missing dateKey")))?;
        Ok(Self {
            id: Some(id.to_string()),
            author: record.author.unwrap_or_else(|| "unknown".to_string()),
            content: record.content.unwrap_or_default(),
            date_key,
            time: record.time.unwrap_or_default(),
            timestamp_ms: record.timestamp_ms.unwrap_or(0),
            tier: record.tier.as_deref().and_then(Tier::parse),
            source_id: record.source_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Entry, EntryRecord, Tier};
    use serde_json::json;

    #[test]
    fn legacy_record_without_time_fields_parses() {
        let entry = Entry::from_value(
            "-Nabc",
            json!({"author": "Amian", "content": "hi", "dateKey": "2025-01-01"}),
        )
        .expect("parse legacy");
        assert_eq!(entry.id.as_deref(), Some("-Nabc"));
        assert_eq!(entry.timestamp_ms, 0);
        assert_eq!(entry.tier, None);
    }

    #[test]
    fn float_and_string_timestamps_are_accepted() {
        let entry = Entry::from_value(
            "a",
            json!({"dateKey": "2025-01-01", "timestampMs": 1735660800000.0}),
        )
        .expect("parse float");
        assert_eq!(entry.timestamp_ms, 1_735_660_800_000);

        let entry = Entry::from_value(
            "b",
            json!({"dateKey": "2025-01-01", "timestampMs": "1735660800001"}),
        )
        .expect("parse string");
        assert_eq!(entry.timestamp_ms, 1_735_660_800_001);
    }

    #[test]
    fn record_without_date_key_is_a_parse_error() {
        let err = Entry::from_value("x", json!({"content": "orphan"})).expect_err("no dateKey");
        assert!(err.to_string().contains("missing dateKey"));
        assert!(Entry::from_value("y", json!("just a string")).is_err());
    }

    #[test]
    fn record_wire_shape_is_camel_case_and_skips_absent_fields() {
        let record = EntryRecord {
            author: Some("hubby".to_string()),
            content: Some("hello".to_string()),
            date_key: Some("2025-01-01".to_string()),
            tier: Some(Tier::Template.label().to_string()),
            ..EntryRecord::default()
        };
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["dateKey"], "2025-01-01");
        assert_eq!(value["tier"], "template");
        assert!(value.get("sourceId").is_none());
        assert!(value.get("timestampMs").is_none());
    }
}
