use log::{info, warn};

use crate::corpus::{CatalogTable, GlossaryTerm, SqlExample, CATALOG, GLOSSARY, SQL_HISTORY};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::schema::*;
use crate::store::{Point, RecordStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub glossary: usize,
    pub sql_history: usize,
    pub catalog: usize,
}

/// Creates the collection unless it already exists. Returns whether it was created.
pub async fn ensure_collection<S>(store: &S, name: &str, dimension: u64) -> Result<bool>
where
    S: RecordStore + ?Sized,
{
    if store.collection_exists(name).await? {
        info!("Collection {} already exists", name);
        return Ok(false);
    }

    store.create_collection(name, dimension).await?;
    info!("Created collection {} ({} dims)", name, dimension);
    Ok(true)
}

/// Creates payload indexes, logging and skipping the ones that fail.
/// Returns the number created.
pub async fn create_indexes<S>(store: &S, indexes: &[PayloadIndex]) -> usize
where
    S: RecordStore + ?Sized,
{
    let mut created = 0;
    for index in indexes {
        match store.create_index(index).await {
            Ok(()) => {
                info!("Created {:?} index on {}.{}", index.kind, index.collection, index.field);
                created += 1;
            }
            Err(e) => warn!(
                "Skipped index on {}.{}: {}",
                index.collection, index.field, e
            ),
        }
    }
    created
}

pub async fn glossary_points<E>(embedder: &E, terms: &[GlossaryTerm]) -> Result<Vec<Point>>
where
    E: EmbeddingProvider + ?Sized,
{
    let mut points = Vec::with_capacity(terms.len());
    for term in terms {
        let payload = GlossaryPayload::from(term);
        points.push(Point {
            id: term.id,
            vector: embedder.embed(&payload.embedding_text()).await?,
            payload: to_payload(&payload)?,
        });
    }
    Ok(points)
}

pub async fn sql_history_points<E>(embedder: &E, examples: &[SqlExample]) -> Result<Vec<Point>>
where
    E: EmbeddingProvider + ?Sized,
{
    let mut points = Vec::with_capacity(examples.len());
    for example in examples {
        let payload = SqlHistoryPayload::from(example);
        points.push(Point {
            id: example.id,
            vector: embedder.embed(&payload.embedding_text()).await?,
            payload: to_payload(&payload)?,
        });
    }
    Ok(points)
}

/// One point per table. Ids count up from [`CATALOG_ID_START`] in input order,
/// so reordering the tables renumbers them.
pub async fn catalog_points<E>(embedder: &E, tables: &[CatalogTable]) -> Result<Vec<Point>>
where
    E: EmbeddingProvider + ?Sized,
{
    let mut points = Vec::with_capacity(tables.len());
    let mut point_id = CATALOG_ID_START;
    for table in tables {
        let payload = CatalogPayload::from(table);
        points.push(Point {
            id: point_id,
            vector: embedder.embed(&payload.embedding_text()).await?,
            payload: to_payload(&payload)?,
        });
        point_id += 1;
    }
    Ok(points)
}

/// Loads the three static corpora, one collection at a time.
///
/// A failure part way leaves earlier collections written.
pub async fn seed_all<S, E>(store: &S, embedder: &E) -> Result<SeedSummary>
where
    S: RecordStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let dimension = embedder.dimension() as u64;
    let mut summary = SeedSummary::default();
    info!("Seeding with {} ({} dims)", embedder.model_name(), dimension);

    ensure_collection(store, GLOSSARY_COLLECTION, dimension).await?;
    create_indexes(store, &SEED_INDEXES[..1]).await;
    let points = glossary_points(embedder, GLOSSARY).await?;
    summary.glossary = points.len();
    store.upsert(GLOSSARY_COLLECTION, points).await?;
    info!("Upserted {} glossary terms", summary.glossary);

    ensure_collection(store, SQL_HISTORY_COLLECTION, dimension).await?;
    create_indexes(store, &SEED_INDEXES[1..]).await;
    let points = sql_history_points(embedder, SQL_HISTORY).await?;
    summary.sql_history = points.len();
    store.upsert(SQL_HISTORY_COLLECTION, points).await?;
    info!("Upserted {} SQL examples", summary.sql_history);

    ensure_collection(store, CATALOG_COLLECTION, dimension).await?;
    let points = catalog_points(embedder, CATALOG).await?;
    summary.catalog = points.len();
    store.upsert(CATALOG_COLLECTION, points).await?;
    info!("Upserted {} catalog tables", summary.catalog);

    Ok(summary)
}

pub fn render_summary(summary: &SeedSummary) -> String {
    format!(
        "✅ Upsert 완료: {} {}건, {} {}건, {} {}건",
        GLOSSARY_COLLECTION,
        summary.glossary,
        SQL_HISTORY_COLLECTION,
        summary.sql_history,
        CATALOG_COLLECTION,
        summary.catalog
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeEmbedder, MemoryStore, TestContext};
    use serde_json::json;

    #[actix_rt::test]
    async fn test_catalog_ids_follow_input_order() {
        let embedder = FakeEmbedder::new(8);
        let points = catalog_points(&embedder, CATALOG).await.unwrap();

        let ids: Vec<u64> = points.iter().map(|p| p.id).collect();
        assert_eq!(ids, (1000..=1007).collect::<Vec<u64>>());
        assert_eq!(points[0].payload["table"], json!("employees"));
        assert_eq!(points[7].payload["table"], json!("project_assignments"));
    }

    #[actix_rt::test]
    async fn test_catalog_ids_change_with_order() {
        let embedder = FakeEmbedder::new(8);
        let reversed: Vec<CatalogTable> = CATALOG.iter().rev().copied().collect();
        let points = catalog_points(&embedder, &reversed).await.unwrap();
        assert_eq!(points[0].id, 1000);
        assert_eq!(points[0].payload["table"], json!("project_assignments"));
    }

    #[actix_rt::test]
    async fn test_points_embed_display_text() {
        let embedder = FakeEmbedder::new(8);
        glossary_points(&embedder, &GLOSSARY[..1]).await.unwrap();
        sql_history_points(&embedder, &SQL_HISTORY[..1]).await.unwrap();

        let texts = embedder.texts();
        assert_eq!(texts[0], "사번 :: 사원 고유키 :: 사번, 직원ID, employee id, uid");
        assert!(texts[1].starts_with("부서별 인원 :: 현재 재직자만 집계 :: SELECT"));
    }

    #[actix_rt::test]
    async fn test_seed_all_fills_three_collections() {
        let ctx = TestContext::new("test_seed_all_fills_three_collections");
        let summary = seed_all(&ctx.store, &ctx.embedder).await.unwrap();

        assert_eq!(
            summary,
            SeedSummary {
                glossary: 8,
                sql_history: 7,
                catalog: 8
            }
        );
        assert_eq!(ctx.store.len(GLOSSARY_COLLECTION), 8);
        assert_eq!(ctx.store.len(SQL_HISTORY_COLLECTION), 7);
        assert_eq!(ctx.store.len(CATALOG_COLLECTION), 8);
        assert_eq!(ctx.embedder.texts().len(), 23);
        assert!(ctx.store.has_index(GLOSSARY_COLLECTION, "type"));
        assert!(ctx.store.has_index(SQL_HISTORY_COLLECTION, "type"));
    }

    #[actix_rt::test]
    async fn test_seed_twice_is_an_overwrite() {
        let ctx = TestContext::new("test_seed_twice_is_an_overwrite");
        seed_all(&ctx.store, &ctx.embedder).await.unwrap();
        seed_all(&ctx.store, &ctx.embedder).await.unwrap();
        assert_eq!(ctx.store.len(GLOSSARY_COLLECTION), 8);
        assert_eq!(ctx.store.len(CATALOG_COLLECTION), 8);
    }

    #[actix_rt::test]
    async fn test_ensure_collection_skips_existing() {
        let store = MemoryStore::default();
        assert!(ensure_collection(&store, "c", 4).await.unwrap());
        assert!(!ensure_collection(&store, "c", 4).await.unwrap());
    }

    #[actix_rt::test]
    async fn test_index_failures_are_skipped() {
        let store = MemoryStore::default();
        // No collections yet, so every index creation fails
        assert_eq!(create_indexes(&store, &SEED_INDEXES).await, 0);

        ensure_collection(&store, GLOSSARY_COLLECTION, 4).await.unwrap();
        assert_eq!(create_indexes(&store, &SEED_INDEXES).await, 1);
    }

    #[actix_rt::test]
    async fn test_embedding_failure_aborts_seeding() {
        let store = MemoryStore::default();
        let embedder = FakeEmbedder::failing(8);
        assert!(seed_all(&store, &embedder).await.is_err());
        // The collection exists but nothing was written
        assert_eq!(store.len(GLOSSARY_COLLECTION), 0);
    }
}
