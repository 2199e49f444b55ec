//! Stock movement API endpoints - JSON API

use axum::extract::{Path, Query};
use chrono::{Local, NaiveDate};
use erpdash_core::aggregate::MovementAnalytics;
use erpdash_core::models::{MovementInput, StockTransfer};
use erpdash_core::{CoreError, Resource, SortDirection, TableView};
use serde_json::Value;

use crate::error::ApiResult;
use crate::params::{date, integer, require_confirmation, table_query, Params, TableParams};
use crate::routes::{load_page, table_json};
use crate::{success, AppState};

pub const MOVEMENT_TABLE: TableParams = TableParams {
    search_fields: &["product_name", "reference", "warehouse"],
    categories: &[("movement_type", "movement_type"), ("warehouse", "warehouse")],
    date_field: Some("date"),
    range: None,
    default_sort: Some(("date", SortDirection::Descending)),
};

/// Analytics window from `end` and `window_days`, defaulting to today and
/// the configured window
pub fn analytics_window(params: &Params, default_days: u32) -> ApiResult<(NaiveDate, u32)> {
    let end = date(params, "end")?.unwrap_or_else(|| Local::now().date_naive());
    let days = integer::<u32>(params, "window_days")?.unwrap_or(default_days);
    if days == 0 {
        return Err(CoreError::InvalidQuery {
            param: "window_days".to_string(),
            reason: "must be at least 1".to_string(),
        }
        .into());
    }
    Ok((end, days))
}

pub async fn api_movements(
    state: axum::extract::State<AppState>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    let query = table_query(&params, &MOVEMENT_TABLE, &state.config)?;
    let page_state = load_page(&state.pages.movements, state.service.records(Resource::StockMovements)).await?;
    let view = TableView::derive(&page_state, &query);
    Ok(axum::Json(table_json(&view, &query)))
}

pub async fn api_movement_analytics(
    state: axum::extract::State<AppState>,
    params: Query<Params>,
) -> ApiResult<axum::Json<MovementAnalytics>> {
    let (end, days) = analytics_window(&params, state.config.analytics.movement_window_days)?;
    Ok(axum::Json(state.service.movement_analytics(end, Some(days)).await?))
}

pub async fn api_movement_create(
    state: axum::extract::State<AppState>,
    axum::Json(movement): axum::Json<MovementInput>,
) -> ApiResult<axum::Json<Value>> {
    let data = state.service.create_movement(&movement).await?;
    Ok(success("Stock movement recorded", data))
}

pub async fn api_movement_update(
    state: axum::extract::State<AppState>,
    Path(id): Path<i64>,
    axum::Json(movement): axum::Json<MovementInput>,
) -> ApiResult<axum::Json<Value>> {
    let data = state.service.update_movement(id, &movement).await?;
    Ok(success("Stock movement updated", data))
}

pub async fn api_movement_delete(
    state: axum::extract::State<AppState>,
    Path(id): Path<i64>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    require_confirmation(&params, &format!("delete stock movement {}", id))?;
    state.service.delete_movement(id).await?;
    log::info!("Deleted stock movement {}", id);
    Ok(success("Stock movement deleted", Value::Null))
}

pub async fn api_stock_transfer(
    state: axum::extract::State<AppState>,
    axum::Json(transfer): axum::Json<StockTransfer>,
) -> ApiResult<axum::Json<Value>> {
    let data = state.service.transfer_stock(&transfer).await?;
    log::info!(
        "Transferred {} of product {} from {} to {}",
        transfer.quantity,
        transfer.product,
        transfer.from_warehouse,
        transfer.to_warehouse
    );
    Ok(success("Stock transferred", data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analytics_window() {
        let params = Params::from([
            ("end".to_string(), "2024-01-10".to_string()),
            ("window_days".to_string(), "7".to_string()),
        ]);
        let (end, days) = analytics_window(&params, 30).unwrap();
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(days, 7);

        let (_, days) = analytics_window(&Params::new(), 30).unwrap();
        assert_eq!(days, 30);

        let zero = Params::from([("window_days".to_string(), "0".to_string())]);
        assert!(analytics_window(&zero, 30).is_err());
    }
}
