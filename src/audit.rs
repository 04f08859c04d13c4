//! Reads change history back out of the store and summarises it.
//!
//! Aggregation is pure: [`latest_updates`], [`field_counts`] and
//! [`reason_counts`] work on already-loaded [`AuditRecord`]s. The `render_*`
//! functions turn them into the console report.

use log::info;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::error::Result;
use crate::history::{parse_history, FieldValue, HistoryEntry, SynonymDiff};
use crate::render::{format_timestamp, preview, rule, truncate};
use crate::schema::*;
use crate::store::{RecordStore, StoredRecord};

/// Upper bound on records read per collection.
pub const SCROLL_LIMIT: u32 = 100;
pub const RECENT_SHOWN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub collection: String,
    pub id: u64,
    pub title: String,
    pub synonyms: Vec<String>,
    pub history: Vec<HistoryEntry>,
}

impl AuditRecord {
    /// Title is `title`, or `table` for catalog records.
    pub fn from_stored(collection: &str, record: &StoredRecord) -> Self {
        let text = |key: &str| record.payload.get(key).and_then(|v| v.as_str());
        let synonyms = record
            .payload
            .get("synonyms")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|s| s.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            collection: collection.to_string(),
            id: record.id,
            title: text("title")
                .or_else(|| text("table"))
                .unwrap_or("N/A")
                .to_string(),
            synonyms,
            history: record
                .payload
                .get(HISTORY_FIELD)
                .map(parse_history)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentUpdate {
    pub collection: String,
    pub id: u64,
    pub title: String,
    /// Empty when no entry carries a timestamp; sorts last.
    pub latest_update: String,
    pub update_count: usize,
}

/// Records with history, most recently changed first.
pub fn latest_updates(records: &[AuditRecord]) -> Vec<RecentUpdate> {
    let mut updates: Vec<RecentUpdate> = records
        .iter()
        .filter(|r| !r.history.is_empty())
        .map(|r| RecentUpdate {
            collection: r.collection.clone(),
            id: r.id,
            title: r.title.clone(),
            latest_update: r
                .history
                .iter()
                .map(|h| h.timestamp.as_str())
                .filter(|t| !t.is_empty())
                .max()
                .unwrap_or("")
                .to_string(),
            update_count: r.history.len(),
        })
        .collect();

    updates.sort_by(|a, b| b.latest_update.cmp(&a.latest_update));
    updates
}

pub fn field_counts(records: &[AuditRecord]) -> BTreeMap<String, usize> {
    count_by(records, |h| &h.field)
}

pub fn reason_counts(records: &[AuditRecord]) -> BTreeMap<String, usize> {
    count_by(records, |h| &h.reason)
}

fn count_by<F>(records: &[AuditRecord], key: F) -> BTreeMap<String, usize>
where
    F: Fn(&HistoryEntry) -> &String,
{
    let mut counts = BTreeMap::new();
    for entry in records.iter().flat_map(|r| &r.history) {
        *counts.entry(key(entry).clone()).or_insert(0) += 1;
    }
    counts
}

pub fn total_entries(records: &[AuditRecord]) -> usize {
    records.iter().map(|r| r.history.len()).sum()
}

/// Highest count first, ties by name.
pub fn ranked(counts: &BTreeMap<String, usize>) -> Vec<(&str, usize)> {
    let mut ranked: Vec<(&str, usize)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ranked
}

pub fn records_with_field<'a>(records: &'a [AuditRecord], field: &str) -> Vec<&'a AuditRecord> {
    records
        .iter()
        .filter(|r| r.history.iter().any(|h| h.field == field))
        .collect()
}

/// Latest history entry that changed `synonyms`.
pub fn latest_synonym_change(history: &[HistoryEntry]) -> Option<&HistoryEntry> {
    history.iter().rev().find(|h| h.field == "synonyms")
}

/// Loads every record of the three collections.
pub async fn load_records<S>(store: &S) -> Result<Vec<AuditRecord>>
where
    S: RecordStore + ?Sized,
{
    let mut records = vec![];
    for collection in COLLECTIONS {
        let stored = store.scroll(collection, None, SCROLL_LIMIT).await?;
        info!("Read {} records from {}", stored.len(), collection);
        records.extend(stored.iter().map(|r| AuditRecord::from_stored(collection, r)));
    }
    Ok(records)
}

fn render_value_change(out: &mut String, entry: &HistoryEntry) {
    let (old, new) = match (&entry.old_value, &entry.new_value) {
        (Some(old), Some(new)) if !old.is_empty() && !new.is_empty() => (old, new),
        _ => return,
    };

    match (old, new) {
        (FieldValue::List(old), FieldValue::List(new)) => {
            let _ = writeln!(out, "        이전 ({}개): {}", old.len(), preview(old, 5));
            let _ = writeln!(out, "        이후 ({}개): {}", new.len(), preview(new, 5));
            let diff = SynonymDiff::between(old, new);
            let added: Vec<&String> = diff.added.iter().collect();
            let removed: Vec<&String> = diff.removed.iter().collect();
            if !added.is_empty() {
                let _ = writeln!(out, "        ✨ 추가됨: {}", preview(&added, 3));
            }
            if !removed.is_empty() {
                let _ = writeln!(out, "        🗑️  제거됨: {}", preview(&removed, 3));
            }
        }
        _ => {
            let old = value_text(old);
            let new = value_text(new);
            let _ = writeln!(out, "        🔴 이전: {}", truncate(&old, 80));
            let _ = writeln!(out, "        🟢 이후: {}", truncate(&new, 80));
            if old != new {
                let _ = writeln!(out, "        ⚠️  완전히 다른 내용으로 변경되었습니다!");
            }
        }
    }
}

fn value_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(text) => text.clone(),
        FieldValue::List(items) => items.join(", "),
    }
}

/// Current state and full history of one glossary record.
pub fn render_record_history(id: u64, payload: Option<&GlossaryPayload>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[1] 특정 포인트(ID: {})의 변경 이력", id);
    let _ = writeln!(out);

    let payload = match payload {
        Some(payload) => payload,
        None => {
            let _ = writeln!(out, "  포인트를 찾을 수 없습니다.");
            return out;
        }
    };

    let _ = writeln!(out, "  제목: {}", payload.title);
    let _ = writeln!(out, "  설명: {}", payload.description);
    let _ = writeln!(out, "  동의어: {}", payload.synonyms.join(", "));
    let _ = writeln!(out);

    if payload.update_history.is_empty() {
        let _ = writeln!(out, "  변경 이력이 없습니다.");
        return out;
    }

    let _ = writeln!(out, "  변경 이력 ({}건):", payload.update_history.len());
    for (idx, entry) in payload.update_history.iter().enumerate() {
        let _ = writeln!(out, "    [{}] {}", idx + 1, format_timestamp(&entry.timestamp));
        let _ = writeln!(out, "        필드: {}", entry.field);
        let _ = writeln!(out, "        사유: {}", entry.reason);
        render_value_change(&mut out, entry);
        let _ = writeln!(out);
    }
    out
}

pub fn render_recent(updates: &[RecentUpdate]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[2] 최근 업데이트된 모든 항목 조회");
    let _ = writeln!(out);

    if updates.is_empty() {
        let _ = writeln!(out, "  최근 업데이트된 항목이 없습니다.");
        return out;
    }

    let _ = writeln!(out, "  총 {}개 항목이 최근에 업데이트되었습니다:", updates.len());
    let _ = writeln!(out);
    for (idx, update) in updates.iter().take(RECENT_SHOWN).enumerate() {
        let _ = writeln!(
            out,
            "  [{}] {} ID {}: {}",
            idx + 1,
            update.collection,
            update.id,
            update.title
        );
        let _ = writeln!(out, "      업데이트 횟수: {}회", update.update_count);
        if !update.latest_update.is_empty() {
            let _ = writeln!(
                out,
                "      최근 업데이트: {}",
                format_timestamp(&update.latest_update)
            );
        }
        let _ = writeln!(out);
    }
    out
}

pub fn render_synonym_records(records: &[&AuditRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[3] 특정 필드(synonyms)가 업데이트된 항목 검색");
    let _ = writeln!(out);

    if records.is_empty() {
        let _ = writeln!(out, "  synonyms 필드가 업데이트된 항목이 없습니다.");
        return out;
    }

    let _ = writeln!(out, "  synonyms 필드가 업데이트된 항목: {}개", records.len());
    let _ = writeln!(out);
    for (idx, record) in records.iter().enumerate() {
        let _ = writeln!(out, "  [{}] ID {}: {}", idx + 1, record.id, record.title);
        let _ = writeln!(out, "      현재 동의어 수: {}개", record.synonyms.len());
        let _ = writeln!(out, "      동의어: {}", preview(&record.synonyms, 5));
        let _ = writeln!(out);
    }
    out
}

pub fn render_statistics(records: &[AuditRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[4] 변경 통계");
    let _ = writeln!(out);

    let changed = records.iter().filter(|r| !r.history.is_empty()).count();
    let _ = writeln!(out, "  총 변경 건수: {}건", total_entries(records));
    let _ = writeln!(out, "  변경된 항목 수: {}개", changed);
    let _ = writeln!(out);

    let _ = writeln!(out, "  필드별 변경 건수:");
    for (field, count) in ranked(&field_counts(records)) {
        let _ = writeln!(out, "    - {}: {}건", field, count);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "  변경 사유별 통계:");
    for (reason, count) in ranked(&reason_counts(records)) {
        let _ = writeln!(out, "    - {}: {}건", reason, count);
    }
    out
}

/// Full before/after of the latest synonym change on one record.
pub fn render_synonym_comparison(id: u64, payload: Option<&GlossaryPayload>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[5] 업데이트 전후 비교 (ID: {})", id);
    let _ = writeln!(out);

    let history = payload.map(|p| p.update_history.as_slice()).unwrap_or(&[]);
    if history.is_empty() {
        let _ = writeln!(out, "  변경 이력이 없습니다.");
        return out;
    }

    let latest = match latest_synonym_change(history) {
        Some(latest) => latest,
        None => {
            let _ = writeln!(out, "  synonyms 필드 변경 이력이 없습니다.");
            return out;
        }
    };

    let as_list = |v: &Option<FieldValue>| -> Vec<String> {
        v.as_ref()
            .and_then(|v| v.as_list())
            .map(|items| items.to_vec())
            .unwrap_or_default()
    };
    let old = as_list(&latest.old_value);
    let new = as_list(&latest.new_value);

    let _ = writeln!(out, "  synonyms 필드 변경 내역:");
    let _ = writeln!(out);
    let _ = writeln!(out, "    🔴 이전 동의어 ({}개):", old.len());
    for (idx, syn) in old.iter().enumerate() {
        let _ = writeln!(out, "      [{}] {}", idx + 1, syn);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "    🟢 이후 동의어 ({}개):", new.len());
    for (idx, syn) in new.iter().enumerate() {
        let _ = writeln!(out, "      [{}] {}", idx + 1, syn);
    }
    let _ = writeln!(out);

    let diff = SynonymDiff::between(&old, &new);
    if !diff.added.is_empty() {
        let _ = writeln!(out, "    ✨ 새로 추가된 동의어 ({}개):", diff.added.len());
        for (idx, syn) in diff.added.iter().enumerate() {
            let _ = writeln!(out, "      [{}] {}", idx + 1, syn);
        }
    }
    if !diff.removed.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "    🗑️  제거된 동의어 ({}개):", diff.removed.len());
        for (idx, syn) in diff.removed.iter().enumerate() {
            let _ = writeln!(out, "      [{}] {}", idx + 1, syn);
        }
    }
    out
}

/// Builds the whole audit report for glossary record `id`.
pub async fn run_audit<S>(store: &S, id: u64) -> Result<String>
where
    S: RecordStore + ?Sized,
{
    let payload = match store.retrieve(GLOSSARY_COLLECTION, id).await? {
        Some(record) => Some(from_payload::<GlossaryPayload>(&record.payload)?),
        None => None,
    };
    let records = load_records(store).await?;
    let glossary: Vec<AuditRecord> = records
        .iter()
        .filter(|r| r.collection == GLOSSARY_COLLECTION)
        .cloned()
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "변경 내역 조회");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", render_record_history(id, payload.as_ref()));
    let _ = writeln!(out, "{}", render_recent(&latest_updates(&records)));
    let _ = writeln!(out, "{}", render_synonym_records(&records_with_field(&glossary, "synonyms")));
    let _ = writeln!(out, "{}", render_statistics(&records));
    let _ = writeln!(out, "{}", render_synonym_comparison(id, payload.as_ref()));
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "변경 내역 조회 완료");
    let _ = writeln!(out, "{}", rule());
    Ok(out)
}
