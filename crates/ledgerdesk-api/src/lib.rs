//! JSON HTTP API for the bookkeeping core
//!
//! Routes are organized into modules:
//! - routes::accounts: chart of accounts
//! - routes::journal: journal entries
//! - routes::reports: financial statements and export
//!
//! Every `/api` route except health reads the tenant from `X-Company-Id` and
//! the acting user from `X-User-Id`.

pub mod error;
pub mod routes;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use ledgerdesk_config::Config;
use ledgerdesk_core::LedgerStore;

pub use error::{ApiError, ApiResult};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::accounts::{
        api_account_parents, api_account_tree, api_accounts, api_delete_account, api_upsert_account,
    };
    use routes::journal::{
        api_approve_journal_entry, api_delete_journal_entry, api_journal_entries, api_journal_entry,
        api_post_journal_entry, api_upsert_journal_entry, api_validate_journal_entry,
    };
    use routes::reports::{api_report, api_report_export};

    let cors_permissive = state.config.server.cors_permissive;

    let router = Router::new()
        .route("/api/health", get(health_check))
        // Chart of accounts
        .route("/api/accounts", get(api_accounts).post(api_upsert_account))
        .route("/api/accounts/tree", get(api_account_tree))
        .route("/api/accounts/:id", delete(api_delete_account))
        .route("/api/accounts/:id/parents", get(api_account_parents))
        // Journal entries
        .route(
            "/api/journal-entries",
            get(api_journal_entries).post(api_upsert_journal_entry),
        )
        .route("/api/journal-entries/validate", post(api_validate_journal_entry))
        .route(
            "/api/journal-entries/:id",
            get(api_journal_entry).delete(api_delete_journal_entry),
        )
        .route("/api/journal-entries/:id/post", post(api_post_journal_entry))
        .route("/api/journal-entries/:id/approve", post(api_approve_journal_entry))
        // Reports
        .route("/api/reports/:kind", get(api_report))
        .route("/api/reports/:kind/export", get(api_report_export))
        .with_state(state);

    if cors_permissive {
        router.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
    } else {
        router
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Bind and serve until Ctrl-C
pub async fn start_server(config: Config, store: Arc<dyn LedgerStore>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = create_router(AppState::new(store, config));

    let listener = TcpListener::bind(&addr).await?;
    log::info!(target: "ledgerdesk::api", "Starting ledgerdesk server on http://{}", addr);
    log::info!(target: "ledgerdesk::api", "  /api/accounts, /api/journal-entries, /api/reports/:kind");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!(target: "ledgerdesk::api", "failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;
    log::info!(target: "ledgerdesk::api", "Server stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use ledgerdesk_core::MemoryStore;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(AppState::new(Arc::new(MemoryStore::new()), Config::default()))
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-company-id", "acme")
            .header("x-user-id", "tester");
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_account(app: &Router, number: &str, name: &str, kind: &str) -> String {
        let (status, body) = send(
            app,
            request(
                "POST",
                "/api/accounts",
                Some(json!({"account_number": number, "account_name": name, "account_type": kind})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    fn entry_payload(cash: &str, sales: &str, debit: f64, credit: f64) -> Value {
        json!({
            "entry": {
                "entry_name": "Cash sale",
                "description": "Counter sale",
                "entry_date": "2024-03-05",
                "financial_statement_section": "revenue"
            },
            "items": [
                {"account_id": cash, "debit": debit},
                {"account_id": sales, "credit": credit}
            ]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_company_header() {
        let response = app()
            .oneshot(Request::builder().uri("/api/accounts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_account_lifecycle() {
        let app = app();
        let root = create_account(&app, "1000", "Assets", "asset").await;

        let (status, child) = send(
            &app,
            request(
                "POST",
                "/api/accounts",
                Some(json!({
                    "account_number": "1100",
                    "account_name": "Cash",
                    "account_type": "asset",
                    "parent_account_id": root
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(child["level"], 2);
        assert_eq!(child["balance_type"], "debit");

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/accounts",
                Some(json!({"account_number": "1100", "account_name": "Dup", "account_type": "asset"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "DUPLICATE_ACCOUNT_NUMBER");

        let (status, parents) = send(&app, request("GET", &format!("/api/accounts/{}/parents", root), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parents.as_array().unwrap().len(), 0);

        let (status, tree) = send(&app, request("GET", "/api/accounts/tree", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tree["roots"][0]["children"][0]["account"]["account_number"], "1100");

        let (status, body) = send(&app, request("DELETE", &format!("/api/accounts/{}", root), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "HAS_CHILDREN");

        let (status, _) = send(&app, request("GET", "/api/accounts?account_type=asset&roots_only=true", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_journal_entry_flow_and_report() {
        let app = app();
        let cash = create_account(&app, "1101", "Cash", "asset").await;
        let sales = create_account(&app, "4101", "Sales", "revenue").await;

        let (status, check) = send(
            &app,
            request(
                "POST",
                "/api/journal-entries/validate",
                Some(entry_payload(&cash, &sales, 100.0, 99.5)),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(check["balanced"], false);
        assert_eq!(check["difference"], 0.5);

        let (status, body) = send(
            &app,
            request("POST", "/api/journal-entries", Some(entry_payload(&cash, &sales, 100.0, 99.5))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INVALID_ENTRY");

        let (status, entry) = send(
            &app,
            request("POST", "/api/journal-entries", Some(entry_payload(&cash, &sales, 1000.0, 1000.0))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(entry["total_debit"], 1000.0);
        let id = entry["id"].as_str().unwrap().to_string();

        let (status, posted) = send(&app, request("POST", &format!("/api/journal-entries/{}/post", id), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(posted["status"], "posted");

        let (status, body) = send(&app, request("DELETE", &format!("/api/journal-entries/{}", id), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ENTRY_LOCKED");

        let (status, report) = send(
            &app,
            request(
                "GET",
                "/api/reports/income_statement?start=2024-03-01&end=2024-03-31",
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["report"], "income_statement");
        assert_eq!(report["total_revenue"], 1000.0);
        assert_eq!(report["net_income"], 1000.0);

        let (status, report) = send(
            &app,
            request("GET", "/api/reports/trial_balance?start=2024-04-01&end=2024-04-30", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["rows"].as_array().map(Vec::len), Some(0));

        let (_, report) = send(&app, request("GET", "/api/reports/trial_balance?period=all", None)).await;
        assert_eq!(report["rows"].as_array().map(Vec::len), Some(2));

        let (status, _) = send(&app, request("GET", "/api/reports/unknown", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_report_export() {
        let app = app();
        let response = app
            .clone()
            .oneshot(request("GET", "/api/reports/trial_balance/export?period=all&bom=false", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/csv; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Account Number,Account Name,Debit,Credit,Balance"));

        let response = app
            .clone()
            .oneshot(request("GET", "/api/reports/balance_sheet/export?format=document&rtl=true", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Balance Sheet"));
        assert!(text.contains("Page 1 of 1"));

        let response = app
            .oneshot(request("GET", "/api/reports/balance_sheet/export?format=xlsx", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
