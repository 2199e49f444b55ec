//! Stock movements page rendering - Full page endpoints

use axum::extract::Query;
use erpdash_core::aggregate::{movement_analytics, MovementAnalytics};
use erpdash_core::models::StockMovement;
use erpdash_core::record::decode_all;
use erpdash_core::{Record, Resource, TableView};
use erpdash_utils::{format_count, format_percentage};

use super::api::{analytics_window, MOVEMENT_TABLE};
use crate::error::ApiResult;
use crate::params::{table_query, Params};
use crate::render::{
    confirm_button, date_inputs, filter_form, page_size_select, search_box, select_filter,
    stat_card, table, warnings, Column, ColumnKind, Formatters,
};
use crate::routes::load_page;
use crate::{AppState, CONTENT_TARGET};

const PATH: &str = "/stock-movements";

const COLUMNS: [Column; 6] = [
    Column::new("date", "Date", ColumnKind::Date),
    Column::new("product_name", "Product", ColumnKind::Text),
    Column::new("movement_type", "Type", ColumnKind::Badge),
    Column::new("quantity", "Quantity", ColumnKind::Number),
    Column::new("warehouse", "Warehouse", ColumnKind::Text),
    Column::new("reference", "Reference", ColumnKind::Text),
];

const MOVEMENT_TYPES: [&str; 4] = ["in", "out", "transfer", "adjustment"];

fn row_actions(record: &Record) -> String {
    match record.id() {
        Some(id) => confirm_button(
            "delete",
            &format!("/api/stock-movements/{}", id),
            "Delete",
            &format!("Delete stock movement {}?", id),
        ),
        None => String::new(),
    }
}

/// Cards plus the per-day and per-type breakdown
fn analytics_panel(analytics: &MovementAnalytics, days: u32, fmt: &Formatters) -> String {
    let quantity = |v: f64| fmt.number.format_number(Some(v), 0);

    let cards = format!(
        "<div class='grid grid-cols-2 md:grid-cols-4 gap-4 mb-4'>{}{}{}{}</div>",
        stat_card(&format!("Movements ({} days)", days), &format_count(analytics.total_movements), "indigo"),
        stat_card("Inbound", &quantity(analytics.total_inbound), "green"),
        stat_card("Outbound", &quantity(analytics.total_outbound), "red"),
        stat_card("Net change", &quantity(analytics.net_change), "blue"),
    );

    let days_html: String = analytics
        .by_day
        .iter()
        .rev()
        .map(|bucket| {
            format!(
                "<tr class='border-b'><td class='px-3 py-1'>{}</td><td class='px-3 py-1 text-right'>{}</td><td class='px-3 py-1 text-right text-green-600'>{}</td><td class='px-3 py-1 text-right text-red-600'>{}</td><td class='px-3 py-1 text-right font-medium'>{}</td></tr>",
                fmt.date(Some(&bucket.date.to_string())),
                bucket.count,
                quantity(bucket.inbound),
                quantity(bucket.outbound),
                quantity(bucket.net)
            )
        })
        .collect();

    let types_html: String = analytics
        .by_type
        .iter()
        .map(|stat| {
            format!(
                "<div class='flex justify-between py-1 text-sm'><span>{}</span><span>{} ({})</span></div>",
                stat.movement_type,
                format_count(stat.count),
                format_percentage(Some(stat.percentage))
            )
        })
        .collect();

    format!(
        r#"{}
        <div class='grid grid-cols-1 lg:grid-cols-3 gap-4 mb-6'>
            <div class='bg-white rounded-xl shadow-sm p-4 lg:col-span-2 max-h-64 overflow-auto'>
                <table class='w-full text-sm'><thead><tr class='text-gray-500'><th class='px-3 text-left'>Day</th><th class='px-3 text-right'>Count</th><th class='px-3 text-right'>In</th><th class='px-3 text-right'>Out</th><th class='px-3 text-right'>Net</th></tr></thead>
                <tbody>{}</tbody></table>
            </div>
            <div class='bg-white rounded-xl shadow-sm p-4'><h3 class='font-semibold mb-2'>By type</h3>{}</div>
        </div>"#,
        cards, days_html, types_html
    )
}

pub async fn page_movements(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    params: Query<Params>,
) -> ApiResult<axum::response::Html<String>> {
    let query = table_query(&params, &MOVEMENT_TABLE, &state.config)?;
    let (end, days) = analytics_window(&params, state.config.analytics.movement_window_days)?;
    let page_state = load_page(&state.pages.movements, state.service.records(Resource::StockMovements)).await?;
    let view = TableView::derive(&page_state, &query);
    let fmt = &state.fmt;

    let mut messages: Vec<String> = view.error.clone().into_iter().collect();
    let analytics_html = match decode_all::<StockMovement>(&page_state.records, "StockMovement") {
        Ok(movements) => analytics_panel(&movement_analytics(&movements, end, Some(days)), days, fmt),
        Err(e) => {
            messages.push(format!("Analytics unavailable: {}", e));
            String::new()
        }
    };

    let mut warehouses: Vec<String> = page_state.records.iter().filter_map(|r| r.text("warehouse")).collect();
    warehouses.sort();
    warehouses.dedup();
    let warehouse_refs: Vec<&str> = warehouses.iter().map(String::as_str).collect();

    let controls = format!(
        "{}{}{}{}{}",
        search_box(&params, PATH, CONTENT_TARGET, "Search product, reference..."),
        select_filter(&params, "movement_type", "types", &MOVEMENT_TYPES),
        select_filter(&params, "warehouse", "warehouses", &warehouse_refs),
        date_inputs(&params),
        page_size_select(&params, &state.config.pagination.page_sizes, state.config.pagination.default_page_size)
    );

    let actions: &dyn Fn(&Record) -> String = &row_actions;
    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Stock Movements</h2></div>
        {}
        {}
        {}
        {}"#,
        warnings(&messages),
        analytics_html,
        filter_form(PATH, CONTENT_TARGET, &controls),
        table(&view.page, &COLUMNS, &query, &params, PATH, CONTENT_TARGET, fmt, Some(actions))
    );

    Ok(axum::response::Html(crate::page_response(&headers, "Stock Movements", PATH, &inner_content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_analytics_panel_lists_days_newest_first() {
        let movements: Vec<StockMovement> = serde_json::from_value(json!([
            {"id": 1, "movement_type": "in", "quantity": 10, "date": "2024-01-08"},
            {"id": 2, "movement_type": "out", "quantity": -4, "date": "2024-01-09"},
        ]))
        .unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let analytics = movement_analytics(&movements, end, Some(7));
        let html = analytics_panel(&analytics, 7, &Formatters::from_config(&Default::default()));

        assert!(html.contains("Movements (7 days)"));
        let newest = html.find("2024-01-09").unwrap();
        let oldest = html.find("2024-01-08").unwrap();
        assert!(newest < oldest);
    }
}
