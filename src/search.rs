use log::info;
use std::fmt::Write;
use std::time::Instant;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::render::{rule, score_bar, truncate};
use crate::schema::*;
use crate::store::{Filter, RecordStore, ScoredRecord, SearchRequest};

/// Asks for the glossary terms, the `employees` columns and the example SQL
/// behind "average salary per title".
pub const DEFAULT_QUERY: &str = "직급별 평균 연봉 조회 방법";
pub const DEFAULT_LIMIT: u64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub collection: &'static str,
    pub label: &'static str,
    pub score_threshold: Option<f32>,
    pub filter: Option<Filter>,
}

/// Glossary, catalog, then SQL history.
pub fn search_plans() -> Vec<SearchPlan> {
    vec![
        SearchPlan {
            collection: GLOSSARY_COLLECTION,
            label: "Glossary 검색 (용어 및 정의)",
            score_threshold: Some(0.3),
            filter: Some(Filter::must("type", RecordType::Glossary.as_str())),
        },
        SearchPlan {
            collection: CATALOG_COLLECTION,
            label: "Catalog 검색 (테이블 및 컬럼 정보)",
            score_threshold: None,
            filter: None,
        },
        SearchPlan {
            collection: SQL_HISTORY_COLLECTION,
            label: "SQL History 검색 (관련 SQL 쿼리 예제)",
            score_threshold: Some(0.1),
            filter: Some(Filter::must("type", RecordType::History.as_str())),
        },
    ]
}

#[derive(Debug, Clone)]
pub struct CollectionHits {
    pub plan: SearchPlan,
    pub elapsed_ms: f64,
    pub hits: Vec<ScoredRecord>,
}

#[derive(Debug, Clone)]
pub struct SearchReport {
    pub query: String,
    pub total_ms: f64,
    pub results: Vec<CollectionHits>,
}

/// Embeds `query` once and searches every collection with it, one after another.
pub async fn search_all<S, E>(store: &S, embedder: &E, query: &str, limit: u64) -> Result<SearchReport>
where
    S: RecordStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let vector = embedder.embed(query).await?;
    info!("Embedded query with {}", embedder.model_name());
    let total_start = Instant::now();

    let mut results = vec![];
    for plan in search_plans() {
        let start = Instant::now();
        let hits = store
            .search(
                plan.collection,
                SearchRequest {
                    vector: vector.clone(),
                    limit,
                    score_threshold: plan.score_threshold,
                    filter: plan.filter.clone(),
                },
            )
            .await?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!("{}: {} hits in {:.2}ms", plan.collection, hits.len(), elapsed_ms);

        results.push(CollectionHits {
            plan,
            elapsed_ms,
            hits,
        });
    }

    Ok(SearchReport {
        query: query.to_string(),
        total_ms: total_start.elapsed().as_secs_f64() * 1000.0,
        results,
    })
}

fn render_glossary_hit(out: &mut String, hit: &ScoredRecord) {
    let payload = from_payload::<GlossaryPayload>(&hit.payload).ok();
    let title = payload.as_ref().map_or("N/A", |p| p.title.as_str());
    let description = payload
        .as_ref()
        .map_or("N/A".to_string(), |p| truncate(&p.description, 80));

    let _ = writeln!(out, "      제목: {}", title);
    let _ = writeln!(out, "      설명: {}", description);
}

fn render_catalog_hit(out: &mut String, hit: &ScoredRecord) {
    let payload = match from_payload::<CatalogPayload>(&hit.payload) {
        Ok(payload) => payload,
        Err(_) => {
            let _ = writeln!(out, "      테이블: N/A");
            return;
        }
    };

    let _ = writeln!(out, "      테이블: {}", payload.table);
    let _ = writeln!(out, "      설명: {}", payload.description);
    if !payload.columns.is_empty() {
        let _ = writeln!(out, "      컬럼:");
        for col in &payload.columns {
            let _ = writeln!(
                out,
                "        - {} ({}): {}",
                col.name, col.dtype, col.description
            );
        }
    }
}

fn render_sql_hit(out: &mut String, hit: &ScoredRecord) {
    let payload = match from_payload::<SqlHistoryPayload>(&hit.payload) {
        Ok(payload) => payload,
        Err(_) => {
            let _ = writeln!(out, "      제목: N/A");
            return;
        }
    };

    let _ = writeln!(out, "      제목: {}", payload.title);
    let _ = writeln!(out, "      설명: {}", truncate(&payload.description, 80));
    if !payload.sql.is_empty() {
        let _ = writeln!(out, "      쿼리: {}", truncate(&payload.sql, 100));
    }
}

pub fn render_report(report: &SearchReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "통합 검색 예제: 하나의 질문으로 관련 정보 검색");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out);
    let _ = writeln!(out, "검색 질문: '{}'", report.query);
    let _ = writeln!(out);

    for (idx, result) in report.results.iter().enumerate() {
        let _ = writeln!(out, "{}", rule());
        let _ = writeln!(out, "[{}] {}", idx + 1, result.plan.label);
        let _ = writeln!(out, "{}", rule());
        let _ = writeln!(out, "검색 시간: {:.2}ms", result.elapsed_ms);
        let _ = writeln!(out, "결과: {}건", result.hits.len());
        let _ = writeln!(out);

        for (rank, hit) in result.hits.iter().enumerate() {
            let _ = writeln!(
                out,
                "  [{}] 점수: {:.4} {}",
                rank + 1,
                hit.score,
                score_bar(hit.score)
            );
            let _ = writeln!(out, "      ID: {}", hit.id);
            match result.plan.collection {
                GLOSSARY_COLLECTION => render_glossary_hit(&mut out, hit),
                CATALOG_COLLECTION => render_catalog_hit(&mut out, hit),
                _ => render_sql_hit(&mut out, hit),
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "검색 요약");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "질문: '{}'", report.query);
    let _ = writeln!(out, "총 검색 시간: {:.2}ms", report.total_ms);
    for result in &report.results {
        let _ = writeln!(
            out,
            "  - {}: {:.2}ms ({}건)",
            result.plan.collection,
            result.elapsed_ms,
            result.hits.len()
        );
    }

    out
}
