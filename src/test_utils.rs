use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::schema::{IndexKind, PayloadIndex};
use crate::seed::seed_all;
use crate::store::{Filter, Payload, Point, RecordStore, ScoredRecord, SearchRequest, StoredRecord};

#[derive(Default)]
struct Collection {
    dimension: u64,
    points: BTreeMap<u64, (Vec<f32>, Payload)>,
    indexes: Vec<(String, IndexKind)>,
}

/// In-process [`RecordStore`] with Qdrant's observable behaviour: upserts
/// replace, `set_payload` merges keys, search is cosine with optional
/// threshold and keyword filters.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }

    pub fn has_index(&self, collection: &str, field: &str) -> bool {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.indexes.iter().any(|(f, _)| f == field))
            .unwrap_or(false)
    }

    pub fn vector(&self, collection: &str, id: u64) -> Option<Vec<f32>> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|c| c.points.get(&id))
            .map(|(v, _)| v.clone())
    }

    fn with_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Collection) -> Result<T>,
    ) -> Result<T> {
        let mut collections = self.collections.lock().unwrap();
        let c = collections
            .get_mut(collection)
            .ok_or_else(|| Error::NotFound(format!("collection {}", collection)))?;
        f(c)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(self.collections.lock().unwrap().contains_key(collection))
    }

    async fn create_collection(&self, collection: &str, dimension: u64) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(collection) {
            return Err(Error::Store(format!("collection {} already exists", collection)));
        }
        collections.insert(
            collection.to_string(),
            Collection {
                dimension,
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn create_index(&self, index: &PayloadIndex) -> Result<()> {
        self.with_collection(index.collection, |c| {
            if !c.indexes.iter().any(|(f, _)| f == index.field) {
                c.indexes.push((index.field.to_string(), index.kind));
            }
            Ok(())
        })
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        self.with_collection(collection, |c| {
            if let Some(p) = points.iter().find(|p| p.vector.len() as u64 != c.dimension) {
                return Err(Error::Store(format!(
                    "point {} has {} dims, expected {}",
                    p.id,
                    p.vector.len(),
                    c.dimension
                )));
            }
            for p in points {
                c.points.insert(p.id, (p.vector, p.payload));
            }
            Ok(())
        })
    }

    async fn retrieve(&self, collection: &str, id: u64) -> Result<Option<StoredRecord>> {
        self.with_collection(collection, |c| {
            Ok(c.points.get(&id).map(|(_, payload)| StoredRecord {
                id,
                payload: payload.clone(),
            }))
        })
    }

    async fn set_payload(&self, collection: &str, id: u64, payload: Payload) -> Result<()> {
        self.with_collection(collection, |c| {
            let (_, existing) = c
                .points
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("{}/{}", collection, id)))?;
            existing.extend(payload);
            Ok(())
        })
    }

    async fn update_vector(&self, collection: &str, id: u64, vector: Vec<f32>) -> Result<()> {
        self.with_collection(collection, |c| {
            let (existing, _) = c
                .points
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("{}/{}", collection, id)))?;
            *existing = vector;
            Ok(())
        })
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: Option<Filter>,
        limit: u32,
    ) -> Result<Vec<StoredRecord>> {
        self.with_collection(collection, |c| {
            Ok(c.points
                .iter()
                .filter(|(_, (_, payload))| filter.as_ref().map_or(true, |f| f.matches(payload)))
                .take(limit as usize)
                .map(|(id, (_, payload))| StoredRecord {
                    id: *id,
                    payload: payload.clone(),
                })
                .collect())
        })
    }

    async fn search(&self, collection: &str, request: SearchRequest) -> Result<Vec<ScoredRecord>> {
        self.with_collection(collection, |c| {
            let mut hits: Vec<ScoredRecord> = c
                .points
                .iter()
                .filter(|(_, (_, payload))| {
                    request.filter.as_ref().map_or(true, |f| f.matches(payload))
                })
                .map(|(id, (vector, payload))| ScoredRecord {
                    id: *id,
                    score: cosine(&request.vector, vector),
                    payload: payload.clone(),
                })
                .filter(|hit| request.score_threshold.map_or(true, |t| hit.score >= t))
                .collect();
            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            hits.truncate(request.limit as usize);
            Ok(hits)
        })
    }
}

/// Deterministic embedder: hashes each character into a bucket, so texts
/// sharing characters land close together.
pub struct FakeEmbedder {
    dimension: usize,
    fail: bool,
    texts: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            texts: Mutex::new(vec![]),
        }
    }

    pub fn failing(dimension: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(dimension)
        }
    }

    /// Every text embedded so far, in call order.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for ch in text.chars().filter(|c| !c.is_whitespace()) {
            // FNV-1a over the char's code point
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in (ch as u32).to_le_bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % self.dimension as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(Error::Unauthorized);
        }
        self.texts.lock().unwrap().push(text.to_string());
        Ok(self.vector_for(text))
    }

    fn model_name(&self) -> &str {
        "fake-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

pub const TEST_DIMENSION: usize = 64;

pub struct TestContext {
    pub name: String,
    pub store: MemoryStore,
    pub embedder: FakeEmbedder,
}

impl TestContext {
    pub fn new(name: &str) -> Self {
        println!("Creating in-memory store `{}` ...", name);

        Self {
            name: name.to_string(),
            store: MemoryStore::default(),
            embedder: FakeEmbedder::new(TEST_DIMENSION),
        }
    }

    /// A context whose store already holds the three static corpora.
    pub async fn seeded(name: &str) -> Self {
        let ctx = Self::new(name);
        seed_all(&ctx.store, &ctx.embedder)
            .await
            .expect("Failed to seed test store");
        ctx
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        println!("Dropping in-memory store {}", self.name);
    }
}
