//! Collections and the payload each one stores.
//!
//! Records are one point per glossary term, one per SQL example and one per
//! catalog table. Older notes mention one point per catalog column; nothing
//! writes that layout any more.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::corpus::{CatalogTable, GlossaryTerm, SqlExample};
use crate::error::Result;
use crate::history::{lenient_history, HistoryEntry};
use crate::store::Payload;

pub const GLOSSARY_COLLECTION: &str = "hr_glossary";
pub const SQL_HISTORY_COLLECTION: &str = "hr_sql_history";
pub const CATALOG_COLLECTION: &str = "hr_catalog";

pub const COLLECTIONS: [&str; 3] = [
    GLOSSARY_COLLECTION,
    SQL_HISTORY_COLLECTION,
    CATALOG_COLLECTION,
];

/// Payload key holding the appended change history.
pub const HISTORY_FIELD: &str = "update_history";

/// Catalog ids are assigned from this counter, one per table, in corpus order.
pub const CATALOG_ID_START: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Keyword,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadIndex {
    pub collection: &'static str,
    pub field: &'static str,
    pub kind: IndexKind,
}

/// Created by the seeder, for the `type` filters used when searching.
pub const SEED_INDEXES: [PayloadIndex; 2] = [
    PayloadIndex {
        collection: GLOSSARY_COLLECTION,
        field: "type",
        kind: IndexKind::Keyword,
    },
    PayloadIndex {
        collection: SQL_HISTORY_COLLECTION,
        field: "type",
        kind: IndexKind::Keyword,
    },
];

/// Created by the mutator once edits are done.
pub const TITLE_INDEXES: [PayloadIndex; 2] = [
    PayloadIndex {
        collection: SQL_HISTORY_COLLECTION,
        field: "title",
        kind: IndexKind::Text,
    },
    PayloadIndex {
        collection: GLOSSARY_COLLECTION,
        field: "title",
        kind: IndexKind::Keyword,
    },
];

/// Value of the `type` payload field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Glossary,
    History,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Glossary => "glossary",
            RecordType::History => "history",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlossaryPayload {
    #[serde(rename = "type")]
    pub kind: RecordType,
    pub original_id: String,
    pub title: String,
    pub description: String,
    pub synonyms: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "lenient_history"
    )]
    pub update_history: Vec<HistoryEntry>,
}

impl GlossaryPayload {
    pub fn embedding_text(&self) -> String {
        glossary_text(&self.title, &self.description, &self.synonyms)
    }
}

impl From<&GlossaryTerm> for GlossaryPayload {
    fn from(term: &GlossaryTerm) -> Self {
        Self {
            kind: RecordType::Glossary,
            original_id: term.original_id.to_string(),
            title: term.title.to_string(),
            description: term.description.to_string(),
            synonyms: term.synonyms.iter().map(|s| s.to_string()).collect(),
            update_history: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SqlHistoryPayload {
    #[serde(rename = "type")]
    pub kind: RecordType,
    pub original_id: String,
    pub title: String,
    pub description: String,
    pub sql: String,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "lenient_history"
    )]
    pub update_history: Vec<HistoryEntry>,
}

impl SqlHistoryPayload {
    pub fn embedding_text(&self) -> String {
        format!("{} :: {} :: {}", self.title, self.description, self.sql)
    }
}

impl From<&SqlExample> for SqlHistoryPayload {
    fn from(example: &SqlExample) -> Self {
        Self {
            kind: RecordType::History,
            original_id: example.original_id.to_string(),
            title: example.title.to_string(),
            description: example.description.to_string(),
            sql: example.sql.to_string(),
            update_history: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub dtype: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogPayload {
    pub table: String,
    pub description: String,
    pub columns: Vec<ColumnDescriptor>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "lenient_history"
    )]
    pub update_history: Vec<HistoryEntry>,
}

impl CatalogPayload {
    pub fn embedding_text(&self) -> String {
        let cols = self
            .columns
            .iter()
            .map(|col| format!("{}: {} :: {}", col.name, col.description, col.dtype))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}: {}\nColumns:\n {}", self.table, self.description, cols)
    }
}

impl From<&CatalogTable> for CatalogPayload {
    fn from(table: &CatalogTable) -> Self {
        Self {
            table: table.table.to_string(),
            description: table.description.to_string(),
            columns: table
                .columns
                .iter()
                .map(|col| ColumnDescriptor {
                    name: col.name.to_string(),
                    dtype: col.dtype.to_string(),
                    description: col.description.to_string(),
                })
                .collect(),
            update_history: vec![],
        }
    }
}

pub fn glossary_text(title: &str, description: &str, synonyms: &[String]) -> String {
    format!("{} :: {} :: {}", title, description, synonyms.join(", "))
}

pub fn to_payload<T: Serialize>(value: &T) -> Result<Payload> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Ok(Payload::from_iter([("value".to_string(), other)])),
    }
}

pub fn from_payload<T: DeserializeOwned>(payload: &Payload) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::Object(
        payload.clone(),
    ))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CATALOG, GLOSSARY, SQL_HISTORY};
    use serde_json::json;

    #[test]
    fn test_glossary_text() {
        let payload = GlossaryPayload::from(&GLOSSARY[0]);
        assert_eq!(
            payload.embedding_text(),
            "사번 :: 사원 고유키 :: 사번, 직원ID, employee id, uid"
        );
    }

    #[test]
    fn test_catalog_text_lists_every_column() {
        let payload = CatalogPayload::from(&CATALOG[1]);
        assert_eq!(
            payload.embedding_text(),
            "departments: 부서 테이블\nColumns:\n dept_id: 부서키 :: UInt32\ndept_name: 부서명 :: String"
        );
    }

    #[test]
    fn test_glossary_payload_shape() {
        let payload = to_payload(&GlossaryPayload::from(&GLOSSARY[1])).unwrap();
        assert_eq!(payload["type"], json!("glossary"));
        assert_eq!(payload["original_id"], json!("g-hq"));
        assert_eq!(payload["synonyms"], json!(["본사", "서울본사", "HQ"]));
        // No history until the first edit
        assert!(!payload.contains_key(HISTORY_FIELD));
    }

    #[test]
    fn test_sql_payload_type_is_history() {
        let payload = to_payload(&SqlHistoryPayload::from(&SQL_HISTORY[0])).unwrap();
        assert_eq!(payload["type"], json!("history"));
        assert!(payload["sql"].as_str().unwrap().starts_with("SELECT"));
    }

    #[test]
    fn test_catalog_payload_has_no_type() {
        let payload = to_payload(&CatalogPayload::from(&CATALOG[0])).unwrap();
        assert!(!payload.contains_key("type"));
        assert_eq!(payload["table"], json!("employees"));
        assert_eq!(payload["columns"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_payload_round_trip_skips_malformed_history() {
        let mut payload = to_payload(&GlossaryPayload::from(&GLOSSARY[0])).unwrap();
        payload.insert(
            HISTORY_FIELD.to_string(),
            json!([
                "not an entry",
                {
                    "timestamp": "2025-01-01T00:00:00",
                    "collection_name": "hr_glossary",
                    "point_id": 1,
                    "field": "synonyms",
                    "old_value": ["a"],
                    "new_value": ["b"],
                    "reason": "test"
                }
            ]),
        );

        let decoded: GlossaryPayload = from_payload(&payload).unwrap();
        assert_eq!(decoded.update_history.len(), 1);
        assert_eq!(decoded.update_history[0].field, "synonyms");
    }
}
