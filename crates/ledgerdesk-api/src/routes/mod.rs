//! Route modules for the API server
//!
//! - accounts: chart of accounts listing, upsert, delete, tree, parent candidates
//! - journal: journal entry listing, validation, upsert and status changes
//! - reports: statement generation and export

pub mod accounts;
pub mod journal;
pub mod reports;

use axum::http::HeaderMap;

use ledgerdesk_core::RequestContext;

use crate::error::{ApiError, ApiResult};

pub const COMPANY_HEADER: &str = "x-company-id";
pub const USER_HEADER: &str = "x-user-id";

/// Build the request context from the tenant headers
pub fn caller(headers: &HeaderMap) -> ApiResult<RequestContext> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let company = header(COMPANY_HEADER)
        .ok_or_else(|| ApiError::bad_request(format!("missing {} header", COMPANY_HEADER)))?;
    let mut ctx = RequestContext::new(company);
    if let Some(user) = header(USER_HEADER) {
        ctx = ctx.with_user(user);
    }
    Ok(ctx)
}
