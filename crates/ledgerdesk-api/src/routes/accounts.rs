//! Chart of accounts endpoints

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::{Account, AccountFilter, AccountTree, AccountTreeNode, AccountType, BalanceType, CoreError};

use super::caller;
use crate::error::{ApiResult, ForCaller};
use crate::AppState;

/// Account form as submitted by clients; id empty for new accounts
#[derive(Debug, Clone, Deserialize)]
pub struct AccountPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub account_name: String,
    pub account_type: AccountType,
    /// Defaults to the type's natural side
    #[serde(default)]
    pub balance_type: Option<BalanceType>,
    #[serde(default)]
    pub parent_account_id: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_cash: bool,
}

impl From<AccountPayload> for Account {
    fn from(payload: AccountPayload) -> Self {
        let mut account = Account::new(
            payload.id,
            payload.account_number,
            payload.account_name,
            payload.account_type,
        );
        if let Some(side) = payload.balance_type {
            account.balance_type = side;
        }
        account.parent_account_id = payload.parent_account_id;
        account.is_active = payload.is_active.unwrap_or(true);
        account.is_cash = payload.is_cash;
        account
    }
}

#[derive(Debug, Serialize)]
pub struct AccountTreeResponse {
    pub roots: Vec<AccountTreeNode>,
    /// Parent loops found in stored data, each as a list of account ids
    pub cycles: Vec<Vec<String>>,
}

pub async fn api_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<AccountFilter>,
) -> ApiResult<Json<Vec<Account>>> {
    let ctx = caller(&headers)?;
    let accounts = state.store.list_accounts(&ctx, &filter).await.for_caller(&ctx, "list_accounts")?;
    Ok(Json(accounts))
}

pub async fn api_upsert_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AccountPayload>,
) -> ApiResult<Json<Account>> {
    let ctx = caller(&headers)?;
    let saved = state
        .store
        .upsert_account(&ctx, payload.into())
        .await
        .for_caller(&ctx, "upsert_account")?;
    Ok(Json(saved))
}

pub async fn api_delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let ctx = caller(&headers)?;
    state.store.delete_account(&ctx, &id).await.for_caller(&ctx, "delete_account")?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accounts that may become the parent of `id`
pub async fn api_account_parents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Account>>> {
    let ctx = caller(&headers)?;
    let accounts = state
        .store
        .list_accounts(&ctx, &AccountFilter::default())
        .await
        .for_caller(&ctx, "list_accounts")?;
    let tree = AccountTree::new(&accounts);
    let node = tree
        .get(&id)
        .ok_or(CoreError::AccountNotFound { id: id.clone() })
        .for_caller(&ctx, "account_parents")?;
    Ok(Json(tree.possible_parents(node).into_iter().cloned().collect()))
}

pub async fn api_account_tree(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AccountTreeResponse>> {
    let ctx = caller(&headers)?;
    let accounts = state
        .store
        .list_accounts(&ctx, &AccountFilter::default())
        .await
        .for_caller(&ctx, "list_accounts")?;
    let tree = AccountTree::new(&accounts);
    Ok(Json(AccountTreeResponse {
        roots: tree.build_forest(),
        cycles: tree.find_cycles(),
    }))
}
