//! Product API endpoints - JSON API

use axum::extract::{Path, Query};
use erpdash_core::aggregate::InventorySummary;
use erpdash_core::models::ProductInput;
use erpdash_core::{PageState, Record, Resource, SortDirection, TableView};
use serde_json::Value;

use crate::error::ApiResult;
use crate::params::{flag, require_confirmation, table_query, Params, TableParams};
use crate::routes::{load_page, table_json};
use crate::{success, AppState};

pub const PRODUCT_TABLE: TableParams = TableParams {
    search_fields: &["sku", "name", "category"],
    categories: &[("category", "category")],
    date_field: None,
    range: Some(("min_price", "max_price", "unit_price")),
    default_sort: Some(("name", SortDirection::Ascending)),
};

fn stock_level(record: &Record) -> f64 {
    record
        .number("quantity_on_hand")
        .or_else(|| record.number("stock_quantity"))
        .unwrap_or(0.0)
}

/// At or below the reorder level
pub fn is_low_stock(record: &Record) -> bool {
    stock_level(record) <= record.number("reorder_level").unwrap_or(0.0)
}

/// Narrow the page to low-stock products when `low_stock` is set
pub fn low_stock_only(params: &Params, state: PageState) -> PageState {
    if !flag(params, "low_stock") {
        return state;
    }
    let mut state = state;
    state.records.retain(is_low_stock);
    state
}

pub async fn api_products(
    state: axum::extract::State<AppState>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    let query = table_query(&params, &PRODUCT_TABLE, &state.config)?;
    let page_state = load_page(&state.pages.products, state.service.records(Resource::Products)).await?;
    let page_state = low_stock_only(&params, page_state);
    let view = TableView::derive(&page_state, &query);
    Ok(axum::Json(table_json(&view, &query)))
}

pub async fn api_product_summary(
    state: axum::extract::State<AppState>,
) -> ApiResult<axum::Json<InventorySummary>> {
    Ok(axum::Json(state.service.inventory_summary().await?))
}

pub async fn api_product_create(
    state: axum::extract::State<AppState>,
    axum::Json(product): axum::Json<ProductInput>,
) -> ApiResult<axum::Json<Value>> {
    let data = state.service.create_product(&product).await?;
    Ok(success("Product created", data))
}

pub async fn api_product_update(
    state: axum::extract::State<AppState>,
    Path(id): Path<i64>,
    axum::Json(product): axum::Json<ProductInput>,
) -> ApiResult<axum::Json<Value>> {
    let data = state.service.update_product(id, &product).await?;
    Ok(success("Product updated", data))
}

pub async fn api_product_delete(
    state: axum::extract::State<AppState>,
    Path(id): Path<i64>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    require_confirmation(&params, &format!("delete product {}", id))?;
    state.service.delete_product(id).await?;
    log::info!("Deleted product {}", id);
    Ok(success("Product deleted", Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_low_stock_filter() {
        let records = Record::from_values(vec![
            json!({"id": 1, "quantity_on_hand": 2, "reorder_level": 5}),
            json!({"id": 2, "quantity_on_hand": 9, "reorder_level": 5}),
            json!({"id": 3, "stock_quantity": "5", "reorder_level": "5"}),
        ])
        .unwrap();
        let state = PageState {
            records,
            ..PageState::default()
        };

        let unfiltered = low_stock_only(&Params::new(), state.clone());
        assert_eq!(unfiltered.records.len(), 3);

        let params = Params::from([("low_stock".to_string(), "true".to_string())]);
        let filtered = low_stock_only(&params, state);
        let ids: Vec<String> = filtered.records.iter().filter_map(|r| r.text("id")).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
