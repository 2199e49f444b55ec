//! Account API endpoints - JSON API

use axum::extract::Query;
use erpdash_core::models::NewAccount;
use erpdash_core::service::ACCOUNT_SEARCH_FIELDS;
use erpdash_core::tree::node_count;
use erpdash_core::{Resource, SortDirection, TableView};
use serde_json::Value;

use crate::error::ApiResult;
use crate::params::{table_query, value, Params, TableParams};
use crate::routes::{load_page, table_json};
use crate::{success, AppState};

pub const ACCOUNT_TABLE: TableParams = TableParams {
    search_fields: &ACCOUNT_SEARCH_FIELDS,
    categories: &[("account_type", "account_type")],
    date_field: None,
    range: Some(("min_balance", "max_balance", "balance")),
    default_sort: Some(("account_code", SortDirection::Ascending)),
};

pub async fn api_accounts(
    state: axum::extract::State<AppState>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    let query = table_query(&params, &ACCOUNT_TABLE, &state.config)?;
    let page_state = load_page(&state.pages.accounts, state.service.records(Resource::Accounts)).await?;
    let view = TableView::derive(&page_state, &query);
    Ok(axum::Json(table_json(&view, &query)))
}

/// Chart of accounts as nested nodes; `q` keeps matches and their ancestors
pub async fn api_account_tree(
    state: axum::extract::State<AppState>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    let tree = state.service.account_tree(value(&params, "q")).await?;
    Ok(axum::Json(serde_json::json!({
        "count": node_count(&tree),
        "tree": tree,
    })))
}

pub async fn api_account_create(
    state: axum::extract::State<AppState>,
    axum::Json(account): axum::Json<NewAccount>,
) -> ApiResult<axum::Json<Value>> {
    let data = state.service.create_account(&account).await?;
    log::info!("Created account {} {}", account.account_code, account.account_name);
    Ok(success("Account created", data))
}
