use async_trait::async_trait;
use log::{debug, info};
use qdrant_client::qdrant::{
    self, point_id::PointIdOptions, value::Kind, Condition, CreateCollectionBuilder,
    CreateFieldIndexCollectionBuilder, Distance, FieldType, GetPointsBuilder, HnswConfigDiff,
    OptimizersConfigDiffBuilder, PointStruct, PointVectors, PointsIdsList, QueryPointsBuilder,
    ScrollPointsBuilder, SetPayloadPointsBuilder, UpdatePointVectorsBuilder, UpsertPointsBuilder,
    VectorParams, VectorsConfig,
};
use qdrant_client::Qdrant;
use serde_json::{Number, Value as Json};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::schema::{IndexKind, PayloadIndex};

/// Record payload as stored: a JSON object.
pub type Payload = serde_json::Map<String, Json>;

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: u64,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub id: u64,
    pub score: f32,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub key: String,
    pub value: String,
}

/// Conjunction of keyword equality conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub must: Vec<FieldMatch>,
}

impl Filter {
    pub fn must(key: &str, value: &str) -> Self {
        Self::default().and(key, value)
    }

    pub fn and(mut self, key: &str, value: &str) -> Self {
        self.must.push(FieldMatch {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn matches(&self, payload: &Payload) -> bool {
        self.must
            .iter()
            .all(|m| payload.get(&m.key).and_then(Json::as_str) == Some(m.value.as_str()))
    }

    fn to_qdrant(&self) -> qdrant::Filter {
        qdrant::Filter::must(
            self.must
                .iter()
                .map(|m| Condition::matches(m.key.clone(), m.value.clone())),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub limit: u64,
    pub score_threshold: Option<f32>,
    pub filter: Option<Filter>,
}

/// Operations the scripts need from a vector store.
///
/// Every call is a single round trip. Nothing is retried.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn collection_exists(&self, collection: &str) -> Result<bool>;

    /// Creates a cosine-distance collection of `dimension`-sized vectors.
    async fn create_collection(&self, collection: &str, dimension: u64) -> Result<()>;

    async fn create_index(&self, index: &PayloadIndex) -> Result<()>;

    /// Inserts or replaces every point in one call.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;

    async fn retrieve(&self, collection: &str, id: u64) -> Result<Option<StoredRecord>>;

    /// Overwrites the given payload keys and leaves the others as they are.
    async fn set_payload(&self, collection: &str, id: u64, payload: Payload) -> Result<()>;

    async fn update_vector(&self, collection: &str, id: u64, vector: Vec<f32>) -> Result<()>;

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<Filter>,
        limit: u32,
    ) -> Result<Vec<StoredRecord>>;

    /// Nearest neighbours, best first.
    async fn search(&self, collection: &str, request: SearchRequest) -> Result<Vec<ScoredRecord>>;
}

/// [`RecordStore`] backed by a Qdrant server over gRPC.
pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    pub fn connect(url: &str) -> Result<Self> {
        info!("Connecting to Qdrant: {}", url);
        let client = Qdrant::from_url(url).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RecordStore for QdrantStore {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.client.collection_exists(collection.to_string()).await?)
    }

    async fn create_collection(&self, collection: &str, dimension: u64) -> Result<()> {
        let vectors = VectorsConfig {
            config: Some(qdrant::vectors_config::Config::Params(VectorParams {
                size: dimension,
                distance: Distance::Cosine as i32,
                on_disk: Some(true),
                ..Default::default()
            })),
        };
        // Large payloads are kept memory-mapped
        let optimizers = OptimizersConfigDiffBuilder::default()
            .memmap_threshold(20_000)
            .build();

        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(vectors)
                    .hnsw_config(HnswConfigDiff {
                        m: Some(16),
                        ef_construct: Some(200),
                        ..Default::default()
                    })
                    .optimizers_config(optimizers),
            )
            .await?;
        Ok(())
    }

    async fn create_index(&self, index: &PayloadIndex) -> Result<()> {
        let field_type = match index.kind {
            IndexKind::Keyword => FieldType::Keyword,
            IndexKind::Text => FieldType::Text,
        };
        self.client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(index.collection, index.field, field_type)
                    .wait(true),
            )
            .await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let points = points
            .into_iter()
            .map(|p| Ok(PointStruct::new(p.id, p.vector, to_qdrant_payload(p.payload)?)))
            .collect::<Result<Vec<_>>>()?;

        debug!("Upserting {} points into {}", points.len(), collection);
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await?;
        Ok(())
    }

    async fn retrieve(&self, collection: &str, id: u64) -> Result<Option<StoredRecord>> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(collection, vec![qdrant::PointId::from(id)])
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await?;

        response
            .result
            .into_iter()
            .next()
            .map(|point| {
                Ok(StoredRecord {
                    id: numeric_id(point.id)?,
                    payload: from_qdrant_payload(point.payload),
                })
            })
            .transpose()
    }

    async fn set_payload(&self, collection: &str, id: u64, payload: Payload) -> Result<()> {
        self.client
            .set_payload(
                SetPayloadPointsBuilder::new(collection, to_qdrant_payload(payload)?)
                    .points_selector(PointsIdsList {
                        ids: vec![id.into()],
                    })
                    .wait(true),
            )
            .await?;
        Ok(())
    }

    async fn update_vector(&self, collection: &str, id: u64, vector: Vec<f32>) -> Result<()> {
        self.client
            .update_vectors(
                UpdatePointVectorsBuilder::new(
                    collection,
                    vec![PointVectors {
                        id: Some(id.into()),
                        vectors: Some(vector.into()),
                    }],
                )
                .wait(true),
            )
            .await?;
        Ok(())
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<Filter>,
        limit: u32,
    ) -> Result<Vec<StoredRecord>> {
        let mut request = ScrollPointsBuilder::new(collection)
            .limit(limit)
            .with_payload(true)
            .with_vectors(false);
        if let Some(filter) = filter {
            request = request.filter(filter.to_qdrant());
        }

        let response = self.client.scroll(request).await?;
        response
            .result
            .into_iter()
            .map(|point| {
                Ok(StoredRecord {
                    id: numeric_id(point.id)?,
                    payload: from_qdrant_payload(point.payload),
                })
            })
            .collect()
    }

    async fn search(&self, collection: &str, request: SearchRequest) -> Result<Vec<ScoredRecord>> {
        let mut query = QueryPointsBuilder::new(collection)
            .query(request.vector)
            .limit(request.limit)
            .with_payload(true);
        if let Some(threshold) = request.score_threshold {
            query = query.score_threshold(threshold);
        }
        if let Some(filter) = request.filter {
            query = query.filter(filter.to_qdrant());
        }

        let response = self.client.query(query).await?;
        response
            .result
            .into_iter()
            .map(|point| {
                Ok(ScoredRecord {
                    id: numeric_id(point.id)?,
                    score: point.score,
                    payload: from_qdrant_payload(point.payload),
                })
            })
            .collect()
    }
}

fn numeric_id(id: Option<qdrant::PointId>) -> Result<u64> {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Num(num)) => Ok(num),
        Some(PointIdOptions::Uuid(uuid)) => Err(Error::Store(format!(
            "expected a numeric point id, got uuid {}",
            uuid
        ))),
        None => Err(Error::store("point without id")),
    }
}

fn to_qdrant_payload(payload: Payload) -> Result<qdrant_client::Payload> {
    Ok(qdrant_client::Payload::try_from(Json::Object(payload))?)
}

fn from_qdrant_payload(payload: HashMap<String, qdrant::Value>) -> Payload {
    payload
        .into_iter()
        .map(|(key, value)| (key, to_json(value)))
        .collect()
}

fn to_json(value: qdrant::Value) -> Json {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Json::Null,
        Some(Kind::BoolValue(b)) => Json::Bool(b),
        Some(Kind::IntegerValue(i)) => Json::Number(i.into()),
        Some(Kind::DoubleValue(d)) => Number::from_f64(d).map(Json::Number).unwrap_or(Json::Null),
        Some(Kind::StringValue(s)) => Json::String(s),
        Some(Kind::ListValue(list)) => Json::Array(list.values.into_iter().map(to_json).collect()),
        Some(Kind::StructValue(s)) => Json::Object(
            s.fields
                .into_iter()
                .map(|(key, value)| (key, to_json(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Json) -> Payload {
        match value {
            Json::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_filter_matches_all_conditions() {
        let filter = Filter::must("level", "column")
            .and("table", "employees")
            .and("column", "salary");
        assert_eq!(filter.must.len(), 3);

        let column = payload(json!({
            "level": "column", "table": "employees", "column": "salary"
        }));
        let table = payload(json!({ "table": "employees", "description": "직원 마스터" }));
        assert!(filter.matches(&column));
        assert!(!filter.matches(&table));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::default().matches(&Payload::new()));
    }

    #[test]
    fn test_filter_compares_strings_only() {
        let filter = Filter::must("id", "1");
        assert!(!filter.matches(&payload(json!({ "id": 1 }))));
    }

    #[test]
    fn test_qdrant_value_to_json() {
        let value = qdrant::Value {
            kind: Some(Kind::ListValue(qdrant::ListValue {
                values: vec![
                    qdrant::Value {
                        kind: Some(Kind::StringValue("사번".to_string())),
                    },
                    qdrant::Value {
                        kind: Some(Kind::IntegerValue(7)),
                    },
                    qdrant::Value {
                        kind: Some(Kind::BoolValue(true)),
                    },
                    qdrant::Value { kind: None },
                ],
            })),
        };
        assert_eq!(to_json(value), json!(["사번", 7, true, null]));
    }

    #[test]
    fn test_numeric_id() {
        let id = Some(qdrant::PointId::from(1000u64));
        assert_eq!(numeric_id(id).unwrap(), 1000);
        assert!(numeric_id(None).is_err());
    }
}
