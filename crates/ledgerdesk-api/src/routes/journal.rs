//! Journal entry endpoints

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::{
    AccountFilter, DateRange, EntryDraft, EntryIssue, EntryRules, EntryStatus, JournalEntry, JournalEntryItem,
};

use super::caller;
use crate::error::{ApiError, ApiResult, ForCaller};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EntryQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub status: Option<EntryStatus>,
}

impl EntryQuery {
    fn range(&self) -> ApiResult<Option<DateRange>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok(Some(DateRange::new(start, end))),
            (None, None) => Ok(None),
            _ => Err(ApiError::bad_request("start and end must be given together")),
        }
    }
}

/// Entry header with its complete set of lines
#[derive(Debug, Clone, Deserialize)]
pub struct EntryPayload {
    pub entry: JournalEntry,
    #[serde(default)]
    pub items: Vec<JournalEntryItem>,
}

/// Live feedback for an entry being edited
#[derive(Debug, Serialize)]
pub struct EntryCheck {
    pub balanced: bool,
    pub total_debit: f64,
    pub total_credit: f64,
    pub difference: f64,
    pub issues: Vec<EntryIssue>,
    pub messages: Vec<String>,
}

pub async fn api_journal_entries(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<EntryQuery>,
) -> ApiResult<Json<Vec<JournalEntry>>> {
    let ctx = caller(&headers)?;
    let range = query.range()?;
    Ok(Json(state
        .store
        .list_journal_entries(&ctx, range, query.status)
        .await
        .for_caller(&ctx, "list_journal_entries")?))
}

pub async fn api_journal_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<JournalEntry>> {
    let ctx = caller(&headers)?;
    let entry = state.store.get_journal_entry(&ctx, &id).await.for_caller(&ctx, "get_journal_entry")?;
    Ok(Json(entry))
}

pub async fn api_upsert_journal_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EntryPayload>,
) -> ApiResult<Json<JournalEntry>> {
    let ctx = caller(&headers)?;
    let saved = state
        .store
        .upsert_journal_entry(&ctx, payload.entry, payload.items)
        .await
        .for_caller(&ctx, "upsert_journal_entry")?;
    Ok(Json(saved))
}

/// Check an entry without saving it
pub async fn api_validate_journal_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EntryPayload>,
) -> ApiResult<Json<EntryCheck>> {
    let ctx = caller(&headers)?;
    let accounts = state
        .store
        .list_accounts(&ctx, &AccountFilter::default())
        .await
        .for_caller(&ctx, "list_accounts")?;
    let rules = EntryRules::from(&state.config.ledger);

    let mut draft = EntryDraft::with_rules(payload.entry, rules.clone());
    draft.replace_lines(payload.items);

    let mut issues = draft.validate();
    issues.extend(rules.validate_against_chart(draft.lines(), &accounts));

    Ok(Json(EntryCheck {
        balanced: draft.is_balanced(),
        total_debit: draft.total_debit(),
        total_credit: draft.total_credit(),
        difference: draft.difference(),
        messages: issues.iter().map(|i| i.to_string()).collect(),
        issues,
    }))
}

pub async fn api_post_journal_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<JournalEntry>> {
    let ctx = caller(&headers)?;
    Ok(Json(state.store.post_entry(&ctx, &id).await.for_caller(&ctx, "post_entry")?))
}

pub async fn api_approve_journal_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<JournalEntry>> {
    let ctx = caller(&headers)?;
    Ok(Json(state.store.approve_entry(&ctx, &id).await.for_caller(&ctx, "approve_entry")?))
}

pub async fn api_delete_journal_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let ctx = caller(&headers)?;
    state
        .store
        .delete_journal_entry(&ctx, &id)
        .await
        .for_caller(&ctx, "delete_journal_entry")?;
    Ok(StatusCode::NO_CONTENT)
}
