//! Report generation and export endpoints

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use ledgerdesk_config::PeriodPreset;
use ledgerdesk_core::{
    generate_report, to_delimited, to_document, AccountFilter, AmountFormat, DateRange, EntryStatus, IntoReportTable,
    Report, ReportKind, ReportPeriod, RequestContext,
};

use super::caller;
use crate::error::{ApiError, ApiResult, ForCaller};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Named period, "all" for no date filter
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ReportQuery {
    /// Explicit dates win over the named period; without either the
    /// configured default applies.
    fn range(&self, default: PeriodPreset, today: NaiveDate) -> ApiResult<Option<DateRange>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => return Ok(ReportPeriod::custom(start, end).resolve(today)),
            (None, None) => {}
            _ => return Err(ApiError::bad_request("start and end must be given together")),
        }

        let preset = match self.period.as_deref() {
            Some("all") => return Ok(None),
            Some(name) => name.parse::<PeriodPreset>().map_err(ApiError::bad_request)?,
            None => default,
        };
        ReportPeriod::new(preset)
            .resolve(today)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request("custom period needs start and end dates"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// "csv" (default) or "document"
    pub format: Option<String>,
    pub bom: Option<bool>,
    pub rtl: Option<bool>,
    pub rows_per_page: Option<usize>,
}

impl ExportQuery {
    fn report(&self) -> ReportQuery {
        ReportQuery {
            period: self.period.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

async fn build_report(state: &AppState, ctx: &RequestContext, kind: &str, query: &ReportQuery) -> ApiResult<Report> {
    let kind: ReportKind = kind.parse().map_err(ApiError::bad_request)?;
    let today = chrono::Local::now().date_naive();
    let range = query.range(state.config.reports.default_period, today)?;

    let entries = state
        .store
        .list_journal_entries(ctx, range, Some(EntryStatus::Posted))
        .await
        .for_caller(ctx, "list_journal_entries")?;
    let accounts = state
        .store
        .list_accounts(ctx, &AccountFilter::default())
        .await
        .for_caller(ctx, "list_accounts")?;
    Ok(generate_report(kind, &entries, &accounts, range.as_ref()))
}

pub async fn api_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Report>> {
    let ctx = caller(&headers)?;
    Ok(Json(build_report(&state, &ctx, &kind, &query).await?))
}

pub async fn api_report_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(kind): Path<String>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let ctx = caller(&headers)?;
    let report = build_report(&state, &ctx, &kind, &query.report()).await?;
    let table = report.to_table(&AmountFormat::from(&state.config.reports));

    let mut export = state.config.export.clone();
    if let Some(bom) = query.bom {
        export.include_bom = bom;
    }
    if let Some(rtl) = query.rtl {
        export.right_to_left = rtl;
    }
    if let Some(rows) = query.rows_per_page.filter(|r| *r > 0) {
        export.rows_per_page = rows;
    }

    let file_stem = report.kind().to_string();
    match query.format.as_deref().unwrap_or("csv") {
        "csv" => {
            let body = to_delimited(&table, &export).for_caller(&ctx, "export_report")?;
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}.csv\"", file_stem),
                    ),
                ],
                body,
            )
                .into_response())
        }
        "document" | "txt" => {
            let body = to_document(&table, export.rows_per_page, export.right_to_left);
            Ok((
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}.txt\"", file_stem),
                    ),
                ],
                body,
            )
                .into_response())
        }
        other => Err(ApiError::bad_request(format!("unknown export format: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_query_range_resolution() {
        let today = date(2024, 1, 15);

        let query = ReportQuery::default();
        let range = query.range(PeriodPreset::PreviousMonth, today).unwrap().unwrap();
        assert_eq!(range, DateRange::new(date(2023, 12, 1), date(2023, 12, 31)));

        let query = ReportQuery {
            period: Some("all".to_string()),
            ..Default::default()
        };
        assert!(query.range(PeriodPreset::CurrentMonth, today).unwrap().is_none());

        let query = ReportQuery {
            period: Some("ytd".to_string()),
            start: Some(date(2023, 5, 1)),
            end: Some(date(2023, 5, 31)),
        };
        let range = query.range(PeriodPreset::CurrentMonth, today).unwrap().unwrap();
        assert_eq!(range.start, date(2023, 5, 1));
    }

    #[test]
    fn test_query_range_errors() {
        let today = date(2024, 1, 15);
        let query = ReportQuery {
            start: Some(today),
            ..Default::default()
        };
        assert!(query.range(PeriodPreset::CurrentMonth, today).is_err());

        let query = ReportQuery {
            period: Some("fortnight".to_string()),
            ..Default::default()
        };
        assert!(query.range(PeriodPreset::CurrentMonth, today).is_err());

        let query = ReportQuery {
            period: Some("custom".to_string()),
            ..Default::default()
        };
        assert!(query.range(PeriodPreset::CurrentMonth, today).is_err());
    }
}
