use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::HISTORY_FIELD;
use crate::store::{Payload, RecordStore};

/// Number of history entries kept on a record. Older entries are dropped.
pub const HISTORY_CAPACITY: usize = 5;

/// Old or new value of a changed field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    List(Vec<String>),
    Text(String),
}

impl FieldValue {
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            FieldValue::Text(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Text(text) => text.is_empty(),
        }
    }
}

fn unknown() -> String {
    "unknown".to_string()
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

fn lenient_label<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(unknown()),
    }
}

fn lenient_point_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_u64().unwrap_or_default())
}

fn lenient_value<'de, D>(deserializer: D) -> std::result::Result<Option<FieldValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

/// One field mutation, stored inside the mutated record's payload.
///
/// Decoding never fails on a JSON object: fields that are missing or of the
/// wrong type fall back to `""`, `0`, `unknown` or `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    /// ISO-8601. Empty when the stored entry had none.
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub collection_name: String,
    #[serde(default, deserialize_with = "lenient_point_id")]
    pub point_id: u64,
    #[serde(default = "unknown", deserialize_with = "lenient_label")]
    pub field: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_value"
    )]
    pub old_value: Option<FieldValue>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_value"
    )]
    pub new_value: Option<FieldValue>,
    #[serde(default = "unknown", deserialize_with = "lenient_label")]
    pub reason: String,
}

impl HistoryEntry {
    pub fn new(
        collection_name: &str,
        point_id: u64,
        field: &str,
        old_value: FieldValue,
        new_value: FieldValue,
        reason: &str,
    ) -> Self {
        Self {
            timestamp: now_timestamp(),
            collection_name: collection_name.to_string(),
            point_id,
            field: field.to_string(),
            old_value: Some(old_value),
            new_value: Some(new_value),
            reason: reason.to_string(),
        }
    }

    /// Synonym diff for list-valued changes.
    pub fn list_diff(&self) -> Option<SynonymDiff> {
        let old = self.old_value.as_ref()?.as_list()?;
        let new = self.new_value.as_ref()?.as_list()?;
        Some(SynonymDiff::between(old, new))
    }
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Appends `entry` and keeps only the last `capacity` entries, oldest first.
pub fn append_history<T>(mut existing: Vec<T>, entry: T, capacity: usize) -> Vec<T> {
    existing.push(entry);
    if existing.len() > capacity {
        let excess = existing.len() - capacity;
        existing.drain(..excess);
    }
    existing
}

/// Set difference between two synonym lists. Order and duplicates are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymDiff {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl SynonymDiff {
    pub fn between(old: &[String], new: &[String]) -> Self {
        let old: BTreeSet<&String> = old.iter().collect();
        let new: BTreeSet<&String> = new.iter().collect();

        Self {
            added: new.difference(&old).map(|s| s.to_string()).collect(),
            removed: old.difference(&new).map(|s| s.to_string()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Decodes stored history. Items that are not JSON objects are skipped.
pub fn parse_history(raw: &Value) -> Vec<HistoryEntry> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Null => return vec![],
        other => {
            warn!("Ignoring non-list history: {}", other);
            return vec![];
        }
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<HistoryEntry>(item.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping malformed history entry {}: {}", item, e);
                None
            }
        })
        .collect()
}

pub(crate) fn lenient_history<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<HistoryEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(parse_history(&raw))
}

/// Appends `entry` to the history of the record it points at.
///
/// This is a read-modify-write with no version check: two writers on the same
/// record race and the last write wins. Callers are expected to be the only
/// writer. Existing entries are kept as stored, even ones this crate cannot
/// decode. Returns the new history length.
pub async fn record_change<S>(store: &S, entry: &HistoryEntry) -> Result<usize>
where
    S: RecordStore + ?Sized,
{
    let collection = entry.collection_name.as_str();
    let record = store
        .retrieve(collection, entry.point_id)
        .await?
        .ok_or_else(|| Error::not_found(&format!("{}/{}", collection, entry.point_id)))?;

    let existing = match record.payload.get(HISTORY_FIELD) {
        Some(Value::Array(items)) => items.clone(),
        _ => vec![],
    };
    let updated = append_history(existing, serde_json::to_value(entry)?, HISTORY_CAPACITY);
    let count = updated.len();

    let mut payload = Payload::new();
    payload.insert(HISTORY_FIELD.to_string(), Value::Array(updated));
    store.set_payload(collection, entry.point_id, payload).await?;

    info!(
        "Recorded {} change on {}/{} ({} in history)",
        entry.field, collection, entry.point_id, count
    );

    Ok(count)
}
