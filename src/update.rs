use ammonia::Builder;
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write;
use std::path::Path;
use validator::Validate;

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::history::{record_change, FieldValue, HistoryEntry};
use crate::render::rule;
use crate::schema::*;
use crate::seed::create_indexes;
use crate::store::{Filter, Payload, RecordStore};

/// Replaces the synonym list of a glossary term.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, PartialEq, Eq)]
pub struct SynonymUpdate {
    pub id: u64,
    #[validate(length(min = 1))]
    #[serde(deserialize_with = "cleanup_list")]
    pub new_synonyms: Vec<String>,
    #[validate(length(min = 1, max = 255))]
    #[serde(deserialize_with = "cleanup_string")]
    pub reason: String,
}

/// Replaces the description of one catalog column.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, PartialEq, Eq)]
pub struct ColumnDescriptionUpdate {
    #[validate(length(min = 1))]
    pub table: String,
    #[validate(length(min = 1))]
    pub column: String,
    #[validate(length(min = 1))]
    #[serde(deserialize_with = "cleanup_string")]
    pub new_description: String,
    #[validate(length(min = 1, max = 255))]
    #[serde(deserialize_with = "cleanup_string")]
    pub reason: String,
}

/// Replaces a glossary description and re-embeds the term with it.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, PartialEq, Eq)]
pub struct DescriptionUpdate {
    pub id: u64,
    #[validate(length(min = 1))]
    #[serde(deserialize_with = "cleanup_string")]
    pub new_description: String,
    #[validate(length(min = 1, max = 255))]
    #[serde(deserialize_with = "cleanup_string")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct UpdatePlan {
    #[serde(default)]
    pub synonyms: Vec<SynonymUpdate>,
    #[serde(default)]
    pub column_descriptions: Vec<ColumnDescriptionUpdate>,
    #[serde(default)]
    pub descriptions: Vec<DescriptionUpdate>,
}

/// Removes markup and returns plain text. Tags are dropped (script and style
/// with their content) and entities are decoded, so `R&D` stays `R&D`.
fn strip_markup(input: &str) -> String {
    let cleaned = Builder::default()
        .tags(HashSet::new())
        .clean(input.trim())
        .to_string();
    cleaned
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

fn cleanup_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(strip_markup(&s))
}

fn cleanup_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Vec<String> = Deserialize::deserialize(deserializer)?;
    Ok(items
        .iter()
        .map(|s| strip_markup(s))
        .filter(|s| !s.is_empty())
        .collect())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl UpdatePlan {
    /// The demo edits: fantasy synonyms for 사번, 부서 and 직급, a new
    /// description for `employees.salary`, and a re-embedded 사번.
    pub fn builtin() -> Self {
        Self {
            synonyms: vec![
                SynonymUpdate {
                    id: 1,
                    new_synonyms: strings(&[
                        "사번",
                        "직원ID",
                        "우주의 고유번호",
                        "외계인 식별자",
                        "마법의 숫자",
                        "시간 여행 티켓",
                        "코스모스 ID",
                    ]),
                    reason: "상상력이 풍부한 동의어 추가 (데모용)".to_string(),
                },
                SynonymUpdate {
                    id: 5,
                    new_synonyms: strings(&[
                        "부서",
                        "팀",
                        "드래곤의 둥지",
                        "우주선 함대",
                        "마법사 길드",
                        "시간의 방",
                    ]),
                    reason: "판타지 요소 추가 (데모용)".to_string(),
                },
                SynonymUpdate {
                    id: 6,
                    new_synonyms: strings(&[
                        "직급",
                        "직위",
                        "용사 계급",
                        "마법사 레벨",
                        "우주 대장",
                        "시간 주인",
                    ]),
                    reason: "게임 세계관 반영 (데모용)".to_string(),
                },
            ],
            column_descriptions: vec![ColumnDescriptionUpdate {
                table: "employees".to_string(),
                column: "salary".to_string(),
                new_description: "우주 보석의 가치 (별의 결정체로 계산, 1만원 = 행성 1개)"
                    .to_string(),
                reason: "우주 판타지 세계관으로 설명 변경 (데모용)".to_string(),
            }],
            descriptions: vec![DescriptionUpdate {
                id: 1,
                new_description: "우주를 관장하는 마법사의 고유 번호 (시간의 흐름을 제어하는 키, 차원을 넘나드는 식별자)"
                    .to_string(),
                reason: "판타지 세계관 설명으로 벡터 재임베딩 및 설명 완전 변경 (데모용)"
                    .to_string(),
            }],
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let plan: UpdatePlan = serde_json::from_str(json)?;
        plan.validate_all()?;
        Ok(plan)
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading update plan from {}", path.display());
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate_all(&self) -> Result<()> {
        for update in &self.synonyms {
            update.validate()?;
        }
        for update in &self.column_descriptions {
            update.validate()?;
        }
        for update in &self.descriptions {
            update.validate()?;
        }
        if self.synonyms.is_empty()
            && self.column_descriptions.is_empty()
            && self.descriptions.is_empty()
        {
            return Err(Error::invalid_input("update plan has no edits"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    /// One entry per applied edit, in order.
    pub applied: Vec<HistoryEntry>,
    pub skipped: Vec<String>,
    pub indexes_created: usize,
}

fn string_list(payload: &Payload, key: &str) -> Vec<String> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn single_field(key: &str, value: Value) -> Payload {
    let mut payload = Payload::new();
    payload.insert(key.to_string(), value);
    payload
}

pub async fn apply_synonym_update<S>(store: &S, update: &SynonymUpdate) -> Result<Option<HistoryEntry>>
where
    S: RecordStore + ?Sized,
{
    let record = match store.retrieve(GLOSSARY_COLLECTION, update.id).await? {
        Some(record) => record,
        None => return Ok(None),
    };
    let old_synonyms = string_list(&record.payload, "synonyms");

    store
        .set_payload(
            GLOSSARY_COLLECTION,
            update.id,
            single_field("synonyms", serde_json::to_value(&update.new_synonyms)?),
        )
        .await?;

    info!(
        "ID {}: {} ({} -> {} synonyms)",
        update.id,
        update.reason,
        old_synonyms.len(),
        update.new_synonyms.len()
    );

    Ok(Some(HistoryEntry::new(
        GLOSSARY_COLLECTION,
        update.id,
        "synonyms",
        FieldValue::List(old_synonyms),
        FieldValue::List(update.new_synonyms.clone()),
        &update.reason,
    )))
}

/// Looks the column up as its own catalog record (`level == column`).
///
/// The seeder stores one record per table, so against a freshly seeded store
/// this finds nothing and the edit is skipped.
pub async fn apply_column_description<S>(
    store: &S,
    update: &ColumnDescriptionUpdate,
) -> Result<Option<HistoryEntry>>
where
    S: RecordStore + ?Sized,
{
    let filter = Filter::must("level", "column")
        .and("table", &update.table)
        .and("column", &update.column);
    let found = store.scroll(CATALOG_COLLECTION, Some(filter), 10).await?;

    let point = match found.into_iter().next() {
        Some(point) => point,
        None => return Ok(None),
    };
    let old_description = point
        .payload
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if old_description == update.new_description {
        return Ok(None);
    }

    store
        .set_payload(
            CATALOG_COLLECTION,
            point.id,
            single_field("description", Value::String(update.new_description.clone())),
        )
        .await?;
    info!(
        "ID {} ({}.{}): description changed",
        point.id, update.table, update.column
    );

    Ok(Some(HistoryEntry::new(
        CATALOG_COLLECTION,
        point.id,
        "description",
        FieldValue::Text(old_description),
        FieldValue::Text(update.new_description.clone()),
        &update.reason,
    )))
}

/// Re-embeds the term from its current title and synonyms and the new
/// description, then replaces vector and description.
pub async fn apply_description_update<S, E>(
    store: &S,
    embedder: &E,
    update: &DescriptionUpdate,
) -> Result<Option<HistoryEntry>>
where
    S: RecordStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let record = match store.retrieve(GLOSSARY_COLLECTION, update.id).await? {
        Some(record) => record,
        None => return Ok(None),
    };
    let current: GlossaryPayload = from_payload(&record.payload)?;

    let text = glossary_text(&current.title, &update.new_description, &current.synonyms);
    let vector = embedder.embed(&text).await?;
    store
        .update_vector(GLOSSARY_COLLECTION, update.id, vector)
        .await?;
    store
        .set_payload(
            GLOSSARY_COLLECTION,
            update.id,
            single_field("description", Value::String(update.new_description.clone())),
        )
        .await?;
    info!("ID {} ({}): vector and description replaced", update.id, current.title);

    Ok(Some(HistoryEntry::new(
        GLOSSARY_COLLECTION,
        update.id,
        "vector + description",
        FieldValue::Text(current.description),
        FieldValue::Text(update.new_description.clone()),
        &update.reason,
    )))
}

/// Applies every edit of `plan` in order, then writes one history entry per
/// applied edit and creates the title indexes.
///
/// Nothing is rolled back: an error part way leaves earlier edits in place.
pub async fn apply_plan<S, E>(store: &S, embedder: &E, plan: &UpdatePlan) -> Result<UpdateReport>
where
    S: RecordStore + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    plan.validate_all()?;
    let mut report = UpdateReport::default();

    for update in &plan.synonyms {
        match apply_synonym_update(store, update).await? {
            Some(entry) => report.applied.push(entry),
            None => {
                warn!("Glossary term {} not found, synonyms unchanged", update.id);
                report
                    .skipped
                    .push(format!("{}/{}: not found", GLOSSARY_COLLECTION, update.id));
            }
        }
    }

    for update in &plan.column_descriptions {
        match apply_column_description(store, update).await? {
            Some(entry) => report.applied.push(entry),
            None => {
                warn!(
                    "No changed column record for {}.{}, description unchanged",
                    update.table, update.column
                );
                report.skipped.push(format!(
                    "{}: {}.{} column record not found or unchanged",
                    CATALOG_COLLECTION, update.table, update.column
                ));
            }
        }
    }

    for update in &plan.descriptions {
        match apply_description_update(store, embedder, update).await? {
            Some(entry) => report.applied.push(entry),
            None => {
                warn!("Glossary term {} not found, not re-embedded", update.id);
                report
                    .skipped
                    .push(format!("{}/{}: not found", GLOSSARY_COLLECTION, update.id));
            }
        }
    }

    for entry in &report.applied {
        record_change(store, entry).await?;
    }
    info!("Stored history for {} edits", report.applied.len());

    report.indexes_created = create_indexes(store, &TITLE_INDEXES).await;

    Ok(report)
}

pub fn render_report(report: &UpdateReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "업데이트 요약");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "총 업데이트 항목 수: {}개", report.applied.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "변경 내역:");
    for (idx, entry) in report.applied.iter().enumerate() {
        let _ = writeln!(out, "  [{}] ID {}: {}", idx + 1, entry.point_id, entry.field);
        let _ = writeln!(out, "      사유: {}", entry.reason);
        let _ = writeln!(out, "      시각: {}", entry.timestamp);
    }
    if !report.skipped.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "건너뛴 항목:");
        for skipped in &report.skipped {
            let _ = writeln!(out, "  - {}", skipped);
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "인덱스 생성: {}/{}",
        report.indexes_created,
        TITLE_INDEXES.len()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "✅ 모든 업데이트 작업 완료");
    let _ = writeln!(out, "💡 변경 내역 조회는 `hr-vectors audit`을 실행하세요");
    out
}
