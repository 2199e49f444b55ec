//! Accounts page rendering - Full page endpoints

use axum::extract::Query;
use erpdash_core::service::build_account_tree;
use erpdash_core::tree::{flatten_with_depth, node_count};
use erpdash_core::{Record, Resource, TableView};
use erpdash_utils::escape_html;

use super::api::ACCOUNT_TABLE;
use crate::error::ApiResult;
use crate::params::{table_query, value, with_params, Params};
use crate::render::{
    filter_form, page_size_select, search_box, select_filter, table, warnings, Column, ColumnKind,
    Formatters,
};
use crate::routes::load_page;
use crate::{AppState, CONTENT_TARGET};

const PATH: &str = "/accounts";

const COLUMNS: [Column; 4] = [
    Column::new("account_code", "Code", ColumnKind::Text),
    Column::new("account_name", "Name", ColumnKind::Text),
    Column::new("account_type", "Type", ColumnKind::Badge),
    Column::new("balance", "Balance", ColumnKind::Currency),
];

fn account_types(records: &[Record]) -> Vec<String> {
    let mut types: Vec<String> = records.iter().filter_map(|r| r.text("account_type")).collect();
    types.sort();
    types.dedup();
    types
}

fn tree_rows(rows: &[(usize, Record)], fmt: &Formatters) -> String {
    if rows.is_empty() {
        return "<tr><td colspan='4' class='px-4 py-8 text-center text-gray-500'>No accounts match the search</td></tr>".to_string();
    }
    rows.iter()
        .map(|(depth, record)| {
            let inactive = record.get("is_active").and_then(|v| v.as_bool()) == Some(false);
            format!(
                "<tr class='border-b hover:bg-gray-50 {}'><td class='px-4 py-2 font-mono' style='padding-left: {}rem'>{}</td><td class='px-4 py-2'>{}</td><td class='px-4 py-2 text-gray-500'>{}</td><td class='px-4 py-2 text-right'>{}</td></tr>",
                if inactive { "text-gray-400" } else { "" },
                1.0 + *depth as f32 * 1.5,
                escape_html(&record.text("account_code").unwrap_or_default()),
                escape_html(&record.text("account_name").unwrap_or_default()),
                escape_html(&record.text("account_type").unwrap_or_default()),
                fmt.currency(record.number("balance"))
            )
        })
        .collect()
}

pub async fn page_accounts(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    params: Query<Params>,
) -> ApiResult<axum::response::Html<String>> {
    let page_state = load_page(&state.pages.accounts, state.service.records(Resource::Accounts)).await?;
    let tree_view = value(&params, "view") != Some("table");
    let types: Vec<String> = account_types(&page_state.records);
    let type_refs: Vec<&str> = types.iter().map(String::as_str).collect();

    let toggle = |label: &str, view: &str, active: bool| {
        let link = with_params(&params, &[("view", view.to_string()), ("page", "1".to_string())]);
        format!(
            "<a href='{p}?{l}' hx-get='{p}?{l}' hx-target='{t}' hx-push-url='true' class='px-3 py-1 rounded {c}'>{}</a>",
            label,
            p = PATH,
            l = link,
            t = CONTENT_TARGET,
            c = if active { "bg-indigo-600 text-white" } else { "bg-gray-100 text-gray-700" }
        )
    };

    let (controls, body) = if tree_view {
        let forest = build_account_tree(page_state.records.clone(), value(&params, "q"))?;
        let rows = flatten_with_depth(&forest);
        let controls = format!(
            "<input type='hidden' name='view' value='tree'>{}",
            search_box(&params, PATH, CONTENT_TARGET, "Search code or name...")
        );
        let body = format!(
            r#"<div class='bg-white rounded-xl shadow-sm overflow-x-auto'>
                <table class='w-full'><thead class='bg-gray-50'><tr>
                    <th class='px-4 py-2 text-left text-sm font-medium text-gray-600'>Code</th>
                    <th class='px-4 py-2 text-left text-sm font-medium text-gray-600'>Name</th>
                    <th class='px-4 py-2 text-left text-sm font-medium text-gray-600'>Type</th>
                    <th class='px-4 py-2 text-right text-sm font-medium text-gray-600'>Balance</th>
                </tr></thead><tbody>{}</tbody></table>
            </div>
            <p class='mt-4 text-sm text-gray-500'>{} accounts shown</p>"#,
            tree_rows(&rows, &state.fmt),
            node_count(&forest)
        );
        (controls, body)
    } else {
        let query = table_query(&params, &ACCOUNT_TABLE, &state.config)?;
        let view = TableView::derive(&page_state, &query);
        let controls = format!(
            "<input type='hidden' name='view' value='table'>{}{}{}",
            search_box(&params, PATH, CONTENT_TARGET, "Search code or name..."),
            select_filter(&params, "account_type", "types", &type_refs),
            page_size_select(&params, &state.config.pagination.page_sizes, state.config.pagination.default_page_size)
        );
        let body = table(&view.page, &COLUMNS, &query, &params, PATH, CONTENT_TARGET, &state.fmt, None);
        (controls, body)
    };

    let error = page_state.error.clone().into_iter().collect::<Vec<_>>();
    let inner_content = format!(
        r#"<div class='flex items-center justify-between mb-6'>
            <h2 class='text-2xl font-bold'>Chart of Accounts</h2>
            <div class='flex gap-2'>{}{}</div>
        </div>
        {}
        {}
        {}"#,
        toggle("Tree", "tree", tree_view),
        toggle("Table", "table", !tree_view),
        warnings(&error),
        filter_form(PATH, CONTENT_TARGET, &controls),
        body
    );

    Ok(axum::response::Html(crate::page_response(&headers, "Chart of Accounts", PATH, &inner_content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tree_rows_indent_children() {
        let parent = Record::from_value(json!({"id": 1, "account_code": "1000", "account_name": "Assets"})).unwrap();
        let child = Record::from_value(json!({"id": 2, "account_code": "1010", "account_name": "Cash", "balance": 50})).unwrap();
        let html = tree_rows(&[(0, parent), (1, child)], &Formatters::from_config(&Default::default()));
        assert!(html.contains("padding-left: 1rem"));
        assert!(html.contains("padding-left: 2.5rem"));
        assert!(html.contains("$50.00"));
    }

    #[test]
    fn test_account_types_are_unique() {
        let records = Record::from_values(vec![
            json!({"id": 1, "account_type": "asset"}),
            json!({"id": 2, "account_type": "income"}),
            json!({"id": 3, "account_type": "asset"}),
        ])
        .unwrap();
        assert_eq!(account_types(&records), vec!["asset", "income"]);
    }
}
