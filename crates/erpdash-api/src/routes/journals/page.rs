//! Journals page rendering - Full page endpoints

use axum::extract::Query;
use erpdash_core::aggregate::journal_summary;
use erpdash_core::dashboard::journal_page;
use erpdash_core::models::{Account, GlJournal, JournalStatus};
use erpdash_core::record::decode_all;
use erpdash_core::{Record, TableView};
use erpdash_utils::{escape_html, format_count};
use std::collections::HashMap;

use super::api::JOURNAL_TABLE;
use crate::error::ApiResult;
use crate::params::{table_query, Params};
use crate::render::{
    confirm_button, date_inputs, filter_form, page_size_select, search_box, select_filter,
    stat_card, table, warnings, Column, ColumnKind, Formatters,
};
use crate::{AppState, CONTENT_TARGET};

const PATH: &str = "/journals";

const COLUMNS: [Column; 6] = [
    Column::new("journal_number", "Number", ColumnKind::Text),
    Column::new("date", "Date", ColumnKind::Date),
    Column::new("description", "Description", ColumnKind::Text),
    Column::new("status", "Status", ColumnKind::Badge),
    Column::new("total_debit", "Debit", ColumnKind::Currency),
    Column::new("total_credit", "Credit", ColumnKind::Currency),
];

const STATUSES: [&str; 3] = ["draft", "posted", "cancelled"];

/// Lifecycle buttons plus the line breakdown of one journal row
fn row_actions(record: &Record, accounts: &HashMap<i64, String>, fmt: &Formatters) -> String {
    let Some(id) = record.id() else {
        return String::new();
    };
    let number = record.text("journal_number").unwrap_or_else(|| id.to_string());
    let status = record.text("status").and_then(|s| s.parse::<JournalStatus>().ok());

    let mut html = String::new();
    if status.as_ref().is_some_and(JournalStatus::can_post) {
        html.push_str(&confirm_button("post", &format!("/api/journals/{}/post", id), "Post", &format!("Post journal {}?", number)));
    }
    if status.as_ref().is_some_and(JournalStatus::can_cancel) {
        html.push_str(&confirm_button("post", &format!("/api/journals/{}/cancel", id), "Cancel", &format!("Cancel journal {}?", number)));
    }
    if status.as_ref().is_some_and(JournalStatus::is_editable) {
        html.push_str(&confirm_button("delete", &format!("/api/journals/{}", id), "Delete", &format!("Delete journal {}?", number)));
    }

    let lines = record
        .get("lines")
        .and_then(|v| v.as_array())
        .map(|lines| {
            lines
                .iter()
                .filter_map(|line| Record::from_value(line.clone()).ok())
                .map(|line| {
                    let account = line
                        .number("account")
                        .and_then(|a| accounts.get(&(a as i64)))
                        .cloned()
                        .unwrap_or_else(|| line.text("account").unwrap_or_default());
                    format!(
                        "<div class='flex justify-between gap-4'><span>{}</span><span>{} / {}</span></div>",
                        escape_html(&account),
                        fmt.currency(line.number("debit")),
                        fmt.currency(line.number("credit"))
                    )
                })
                .collect::<String>()
        })
        .unwrap_or_default();
    if !lines.is_empty() {
        html.push_str(&format!(
            "<details class='text-left text-xs text-gray-600 mt-1'><summary class='cursor-pointer'>Lines</summary>{}</details>",
            lines
        ));
    }
    html
}

fn account_labels(accounts: &[Account]) -> HashMap<i64, String> {
    accounts
        .iter()
        .map(|a| (a.id, format!("{} {}", a.account_code, a.account_name)))
        .collect()
}

pub async fn page_journals(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    params: Query<Params>,
) -> ApiResult<axum::response::Html<String>> {
    let query = table_query(&params, &JOURNAL_TABLE, &state.config)?;
    let data = journal_page(&state.service, &state.pages.journals).await;
    let view = TableView::derive(&data.state, &query);
    let fmt = &state.fmt;

    let summary = decode_all::<GlJournal>(&data.state.records, "GlJournal")
        .map(|journals| journal_summary(&journals))
        .ok();
    let cards = summary
        .map(|s| {
            format!(
                "<div class='grid grid-cols-2 md:grid-cols-4 gap-4 mb-6'>{}{}{}{}</div>",
                stat_card("Journals", &format_count(s.total), "indigo"),
                stat_card("Drafts", &format_count(s.draft), "yellow"),
                stat_card("Posted", &format_count(s.posted), "green"),
                stat_card("Unbalanced drafts", &format_count(s.unbalanced_drafts.len()), "red"),
            )
        })
        .unwrap_or_default();

    let labels = account_labels(&data.accounts);
    let actions: &dyn Fn(&Record) -> String = &|record| row_actions(record, &labels, fmt);

    let controls = format!(
        "{}{}{}<input type='number' step='0.01' name='min_amount' value='{}' placeholder='Min amount' class='px-3 py-2 border rounded-lg w-32'>\
         <input type='number' step='0.01' name='max_amount' value='{}' placeholder='Max amount' class='px-3 py-2 border rounded-lg w-32'>{}",
        search_box(&params, PATH, CONTENT_TARGET, "Search number, description..."),
        select_filter(&params, "status", "statuses", &STATUSES),
        date_inputs(&params),
        escape_html(params.get("min_amount").map(String::as_str).unwrap_or("")),
        escape_html(params.get("max_amount").map(String::as_str).unwrap_or("")),
        page_size_select(&params, &state.config.pagination.page_sizes, state.config.pagination.default_page_size)
    );

    let mut messages = data.warnings.clone();
    if let Some(error) = &view.error {
        if !messages.iter().any(|m| m.contains(error.as_str())) {
            messages.push(error.clone());
        }
    }

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>GL Journals</h2></div>
        {}
        {}
        {}
        {}"#,
        warnings(&messages),
        cards,
        filter_form(PATH, CONTENT_TARGET, &controls),
        table(&view.page, &COLUMNS, &query, &params, PATH, CONTENT_TARGET, fmt, Some(actions))
    );

    Ok(axum::response::Html(crate::page_response(&headers, "GL Journals", PATH, &inner_content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fmt() -> Formatters {
        Formatters::from_config(&Default::default())
    }

    #[test]
    fn test_actions_follow_status() {
        let draft = Record::from_value(json!({"id": 7, "journal_number": "JV-7", "status": "draft"})).unwrap();
        let html = row_actions(&draft, &HashMap::new(), &fmt());
        assert!(html.contains("/api/journals/7/post"));
        assert!(html.contains("hx-delete='/api/journals/7?confirm=true'"));
        assert!(!html.contains("/cancel"));

        let posted = Record::from_value(json!({"id": 8, "journal_number": "JV-8", "status": "posted"})).unwrap();
        let html = row_actions(&posted, &HashMap::new(), &fmt());
        assert!(html.contains("/api/journals/8/cancel"));
        assert!(!html.contains("/post"));
        assert!(!html.contains("hx-delete"));
    }

    #[test]
    fn test_lines_use_account_labels() {
        let record = Record::from_value(json!({
            "id": 1, "status": "cancelled",
            "lines": [{"account": 3, "debit": "10.00", "credit": "0.00"}]
        }))
        .unwrap();
        let labels = HashMap::from([(3, "1010 Cash".to_string())]);
        let html = row_actions(&record, &labels, &fmt());
        assert!(html.contains("1010 Cash"));
        assert!(html.contains("$10.00 / $0.00"));
    }
}
