//! Journal API endpoints - JSON API

use axum::extract::{Path, Query};
use erpdash_core::models::NewJournal;
use erpdash_core::{Resource, SortDirection, TableView};
use serde_json::Value;

use crate::error::ApiResult;
use crate::params::{require_confirmation, table_query, Params, TableParams};
use crate::routes::{load_page, table_json};
use crate::{success, AppState};

pub const JOURNAL_TABLE: TableParams = TableParams {
    search_fields: &["journal_number", "description", "reference"],
    categories: &[("status", "status")],
    date_field: Some("date"),
    range: Some(("min_amount", "max_amount", "total_debit")),
    default_sort: Some(("date", SortDirection::Descending)),
};

pub async fn api_journals(
    state: axum::extract::State<AppState>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    let query = table_query(&params, &JOURNAL_TABLE, &state.config)?;
    let page_state = load_page(&state.pages.journals, state.service.records(Resource::Journals)).await?;
    let view = TableView::derive(&page_state, &query);
    Ok(axum::Json(table_json(&view, &query)))
}

pub async fn api_journal_create(
    state: axum::extract::State<AppState>,
    axum::Json(journal): axum::Json<NewJournal>,
) -> ApiResult<axum::Json<Value>> {
    let data = state.service.create_journal(&journal).await?;
    Ok(success("Journal created", data))
}

pub async fn api_journal_update(
    state: axum::extract::State<AppState>,
    Path(id): Path<i64>,
    axum::Json(journal): axum::Json<NewJournal>,
) -> ApiResult<axum::Json<Value>> {
    let data = state.service.update_journal(id, &journal).await?;
    Ok(success("Journal updated", data))
}

pub async fn api_journal_delete(
    state: axum::extract::State<AppState>,
    Path(id): Path<i64>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    require_confirmation(&params, &format!("delete journal {}", id))?;
    state.service.delete_journal(id).await?;
    log::info!("Deleted journal {}", id);
    Ok(success("Journal deleted", Value::Null))
}

pub async fn api_journal_post(
    state: axum::extract::State<AppState>,
    Path(id): Path<i64>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    require_confirmation(&params, &format!("post journal {}", id))?;
    let data = state.service.post_journal(id).await?;
    log::info!("Posted journal {}", id);
    Ok(success("Journal posted", data))
}

pub async fn api_journal_cancel(
    state: axum::extract::State<AppState>,
    Path(id): Path<i64>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    require_confirmation(&params, &format!("cancel journal {}", id))?;
    let data = state.service.cancel_journal(id).await?;
    log::info!("Cancelled journal {}", id);
    Ok(success("Journal cancelled", data))
}
