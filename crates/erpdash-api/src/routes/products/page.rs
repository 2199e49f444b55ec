//! Products page rendering - Full page endpoints

use axum::extract::Query;
use erpdash_core::aggregate::inventory_summary;
use erpdash_core::models::Product;
use erpdash_core::record::decode_all;
use erpdash_core::{Record, Resource, TableView};
use erpdash_utils::{escape_html, format_count, format_percentage};

use super::api::{is_low_stock, low_stock_only, PRODUCT_TABLE};
use crate::error::ApiResult;
use crate::params::{flag, table_query, Params};
use crate::render::{
    confirm_button, filter_form, page_size_select, search_box, select_filter, stat_card, table,
    warnings, Column, ColumnKind,
};
use crate::routes::load_page;
use crate::{AppState, CONTENT_TARGET};

const PATH: &str = "/products";

const COLUMNS: [Column; 6] = [
    Column::new("sku", "SKU", ColumnKind::Text),
    Column::new("name", "Name", ColumnKind::Text),
    Column::new("category", "Category", ColumnKind::Text),
    Column::new("unit_price", "Unit price", ColumnKind::Currency),
    Column::new("quantity_on_hand", "On hand", ColumnKind::Number),
    Column::new("reorder_level", "Reorder at", ColumnKind::Number),
];

fn row_actions(record: &Record) -> String {
    let mut html = String::new();
    if is_low_stock(record) {
        html.push_str("<span class='px-2 py-1 rounded text-xs bg-red-100 text-red-700'>Low stock</span>");
    }
    if let Some(id) = record.id() {
        let name = record.text("name").unwrap_or_else(|| id.to_string());
        html.push_str(&confirm_button(
            "delete",
            &format!("/api/products/{}", id),
            "Delete",
            &format!("Delete product {}?", name),
        ));
    }
    html
}

pub async fn page_products(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    params: Query<Params>,
) -> ApiResult<axum::response::Html<String>> {
    let query = table_query(&params, &PRODUCT_TABLE, &state.config)?;
    let page_state = load_page(&state.pages.products, state.service.records(Resource::Products)).await?;
    let fmt = &state.fmt;

    let mut categories: Vec<String> = page_state.records.iter().filter_map(|r| r.text("category")).collect();
    categories.sort();
    categories.dedup();
    let category_refs: Vec<&str> = categories.iter().map(String::as_str).collect();

    // summary covers the whole catalogue, not the filtered page
    let summary = decode_all::<Product>(&page_state.records, "Product")
        .map(|products| inventory_summary(&products))
        .ok();
    let summary_html = summary
        .map(|s| {
            let by_category: String = s
                .by_category
                .iter()
                .map(|c| {
                    format!(
                        "<div class='flex justify-between text-sm py-1'><span>{}</span><span>{} ({})</span></div>",
                        escape_html(&c.category),
                        fmt.currency(Some(c.stock_value)),
                        format_percentage(Some(c.percentage))
                    )
                })
                .collect();
            format!(
                r#"<div class='grid grid-cols-1 md:grid-cols-4 gap-4 mb-6'>{}{}{}
                    <div class='bg-white p-4 rounded-lg border'>{}</div>
                </div>"#,
                stat_card("Products", &format_count(s.product_count), "indigo"),
                stat_card("Stock value", &fmt.currency(Some(s.total_stock_value)), "green"),
                stat_card("Low stock", &format_count(s.low_stock_count), "red"),
                by_category
            )
        })
        .unwrap_or_default();

    let page_state = low_stock_only(&params, page_state);
    let view = TableView::derive(&page_state, &query);

    let controls = format!(
        "{}{}<input type='number' step='0.01' name='min_price' value='{}' placeholder='Min price' class='px-3 py-2 border rounded-lg w-28'>\
         <input type='number' step='0.01' name='max_price' value='{}' placeholder='Max price' class='px-3 py-2 border rounded-lg w-28'>\
         <label class='flex items-center gap-1 text-sm'><input type='checkbox' name='low_stock' value='true' {}> Low stock only</label>{}",
        search_box(&params, PATH, CONTENT_TARGET, "Search SKU, name..."),
        select_filter(&params, "category", "categories", &category_refs),
        escape_html(params.get("min_price").map(String::as_str).unwrap_or("")),
        escape_html(params.get("max_price").map(String::as_str).unwrap_or("")),
        if flag(&params, "low_stock") { "checked" } else { "" },
        page_size_select(&params, &state.config.pagination.page_sizes, state.config.pagination.default_page_size)
    );

    let error = view.error.clone().into_iter().collect::<Vec<_>>();
    let actions: &dyn Fn(&Record) -> String = &row_actions;
    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Products</h2></div>
        {}
        {}
        {}
        {}"#,
        warnings(&error),
        summary_html,
        filter_form(PATH, CONTENT_TARGET, &controls),
        table(&view.page, &COLUMNS, &query, &params, PATH, CONTENT_TARGET, fmt, Some(actions))
    );

    Ok(axum::response::Html(crate::page_response(&headers, "Products", PATH, &inner_content)))
}
