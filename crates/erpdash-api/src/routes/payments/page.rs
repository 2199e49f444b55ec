//! Payment advices page rendering - Full page endpoints

use axum::extract::Query;
use erpdash_core::{Record, Resource, TableView};
use erpdash_utils::escape_html;

use super::api::ADVICE_TABLE;
use crate::error::ApiResult;
use crate::params::{table_query, Params};
use crate::render::{
    confirm_button, date_inputs, filter_form, page_size_select, search_box, select_filter, table,
    warnings, Column, ColumnKind,
};
use crate::routes::load_page;
use crate::{AppState, CONTENT_TARGET};

const PATH: &str = "/payment-advices";

const COLUMNS: [Column; 5] = [
    Column::new("advice_number", "Advice", ColumnKind::Text),
    Column::new("customer", "Customer", ColumnKind::Text),
    Column::new("payment_date", "Paid on", ColumnKind::Date),
    Column::new("amount", "Amount", ColumnKind::Currency),
    Column::new("status", "Status", ColumnKind::Badge),
];

fn row_actions(record: &Record) -> String {
    let mut html = String::new();
    if let Some(invoices) = record.get("invoice_numbers").and_then(|v| v.as_array()) {
        let numbers: Vec<&str> = invoices.iter().filter_map(|v| v.as_str()).collect();
        if !numbers.is_empty() {
            html.push_str(&format!(
                "<span class='text-xs text-gray-500 mr-2' title='{}'>{} invoices</span>",
                escape_html(&numbers.join(", ")),
                numbers.len()
            ));
        }
    }
    if let Some(document) = record.text("document").filter(|d| !d.is_empty()) {
        html.push_str(&format!(
            "<a href='{}' target='_blank' class='text-sm text-indigo-600 hover:text-indigo-800 mr-2'>Document</a>",
            escape_html(&document)
        ));
    }
    if let Some(id) = record.id() {
        let number = record.text("advice_number").unwrap_or_else(|| id.to_string());
        html.push_str(&confirm_button(
            "delete",
            &format!("/api/payment-advices/{}", id),
            "Delete",
            &format!("Delete payment advice {}?", number),
        ));
    }
    html
}

fn upload_form() -> String {
    format!(
        r#"<form class='bg-white rounded-xl shadow-sm p-4 mb-6 flex flex-wrap gap-2 items-end' hx-post='/api/payment-advices' hx-encoding='multipart/form-data' hx-swap='none' hx-on::after-request='if (event.detail.successful) htmx.ajax("GET", window.location.href, "{}")'>
        <input type='text' name='customer' placeholder='Customer' required class='px-3 py-2 border rounded-lg'>
        <input type='number' step='0.01' name='amount' placeholder='Amount' required class='px-3 py-2 border rounded-lg w-32'>
        <input type='date' name='payment_date' class='px-3 py-2 border rounded-lg'>
        <input type='file' name='document' class='text-sm'>
        <button type='submit' class='px-4 py-2 bg-indigo-600 text-white rounded-lg'>Add advice</button>
    </form>"#,
        CONTENT_TARGET
    )
}

pub async fn page_advices(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    params: Query<Params>,
) -> ApiResult<axum::response::Html<String>> {
    let query = table_query(&params, &ADVICE_TABLE, &state.config)?;
    let page_state = load_page(&state.pages.payments, state.service.records(Resource::PaymentAdvices)).await?;
    let view = TableView::derive(&page_state, &query);

    let mut statuses: Vec<String> = page_state.records.iter().filter_map(|r| r.text("status")).collect();
    statuses.sort();
    statuses.dedup();
    let status_refs: Vec<&str> = statuses.iter().map(String::as_str).collect();

    let controls = format!(
        "{}{}{}{}",
        search_box(&params, PATH, CONTENT_TARGET, "Search advice, customer..."),
        select_filter(&params, "status", "statuses", &status_refs),
        date_inputs(&params),
        page_size_select(&params, &state.config.pagination.page_sizes, state.config.pagination.default_page_size)
    );

    let error: Vec<String> = view.error.clone().into_iter().collect();
    let actions: &dyn Fn(&Record) -> String = &row_actions;
    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Payment Advices</h2></div>
        {}
        {}
        {}
        {}"#,
        warnings(&error),
        upload_form(),
        filter_form(PATH, CONTENT_TARGET, &controls),
        table(&view.page, &COLUMNS, &query, &params, PATH, CONTENT_TARGET, &state.fmt, Some(actions))
    );

    Ok(axum::response::Html(crate::page_response(&headers, "Payment Advices", PATH, &inner_content)))
}
