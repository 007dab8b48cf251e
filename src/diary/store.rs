use crate::diary::entry::EntryRecord;
use crate::error::DiaryError;
use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Raw `id -> record` pairs as returned by the store, in key order.
pub type RawRecords = Vec<(String, Value)>;

/// Read/append access to one collection of the remote log.
pub trait EntryStore {
    /// Server-side equality filter on `field`. Not every deployment has the
    /// index this needs, so callers must be ready to fall back to `read_all`.
    fn query_equal(&self, field: &str, value: &str) -> Result<RawRecords, DiaryError>;
    fn read_all(&self) -> Result<RawRecords, DiaryError>;
    /// Insert-only write; the store assigns and returns the new id.
    fn append(&self, record: &EntryRecord) -> Result<String, DiaryError>;
    /// Keyed overwrite of `<collection>/<key>`.
    fn put(&self, key: &str, record: &EntryRecord) -> Result<(), DiaryError>;
    fn label(&self) -> String;
}

/// Firebase Realtime Database over its REST `.json` endpoints.
pub struct FirebaseStore {
    base_url: String,
    collection: String,
    auth: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    #[serde(default)]
    name: Option<String>,
}

impl FirebaseStore {
    pub fn new(
        base_url: &str,
        collection: &str,
        auth: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build store HTTP client")?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            collection: collection.trim().trim_matches('/').to_string(),
            auth,
            client,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/{}.json", self.base_url, self.collection)
    }

    fn keyed_url(&self, key: &str) -> String {
        format!("{}/{}/{}.json", self.base_url, self.collection, key)
    }

    fn auth_query(&self) -> Vec<(&'static str, String)> {
        match &self.auth {
            Some(token) => vec![("auth", token.clone())],
            None => Vec::new(),
        }
    }

    fn read(&self, extra: Vec<(&'static str, String)>) -> Result<RawRecords, DiaryError> {
        let mut query = self.auth_query();
        query.extend(extra);
        let response = self
            .client
            .get(self.collection_url())
            .query(&query)
            .send()
            .map_err(|err| {
                DiaryError::HistoryFetch(format!("request failed: {}", err.without_url()))
            })?;
        let response = ensure_success(response).map_err(DiaryError::HistoryFetch)?;
        let body: Value = response.json().map_err(|err| {
            DiaryError::Parse(format!("store body is not JSON: {}", err.without_url()))
        })?;
        parse_collection(body)
    }
}

fn ensure_success(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    Err(format!("status {status}: {}", snippet.trim()))
}

/// Id from a push response body; `unknown` when absent or unreadable.
pub fn push_id_from_body(body: &str) -> String {
    serde_json::from_str::<PushResponse>(body)
        .ok()
        .and_then(|parsed| parsed.name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Firebase returns `null` for an empty collection and an object keyed by
/// push id otherwise.
pub fn parse_collection(body: Value) -> Result<RawRecords, DiaryError> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> = map.into_iter().collect();
            Ok(ordered.into_iter().collect())
        }
        other => Err(DiaryError::Parse(format!(
            "expected object of records, got {}",
            json_kind(&other)
        ))),
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

impl EntryStore for FirebaseStore {
    fn query_equal(&self, field: &str, value: &str) -> Result<RawRecords, DiaryError> {
        // Firebase wants JSON-quoted values for orderBy/equalTo.
        self.read(vec![
            ("orderBy", format!("\"{field}\"")),
            ("equalTo", format!("\"{value}\"")),
        ])
    }

    fn read_all(&self) -> Result<RawRecords, DiaryError> {
        self.read(Vec::new())
    }

    fn append(&self, record: &EntryRecord) -> Result<String, DiaryError> {
        let response = self
            .client
            .post(self.collection_url())
            .query(&self.auth_query())
            .json(record)
            .send()
            .map_err(|err| {
                DiaryError::Publish(format!("request failed: {}", err.without_url()))
            })?;
        let response = ensure_success(response).map_err(DiaryError::Publish)?;
        // A 2xx means the record landed, whatever the body says.
        let body = response.text().unwrap_or_default();
        Ok(push_id_from_body(&body))
    }

    fn put(&self, key: &str, record: &EntryRecord) -> Result<(), DiaryError> {
        let response = self
            .client
            .put(self.keyed_url(key))
            .query(&self.auth_query())
            .json(record)
            .send()
            .map_err(|err| {
                DiaryError::Publish(format!("request failed: {}", err.without_url()))
            })?;
        ensure_success(response).map_err(DiaryError::Publish)?;
        Ok(())
    }

    fn label(&self) -> String {
        format!("firebase:{}", self.collection)
    }
}
