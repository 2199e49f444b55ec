//! HTML fragments shared by the list pages

use erpdash_config::Config;
use erpdash_core::{Page, Record, SortDescriptor, SortDirection, TableQuery};
use erpdash_utils::{escape_html, format_count, DateFormat, DateStyle, NumberFormat};

use crate::params::{with_params, Params};

/// Formatting rules taken from the config
#[derive(Debug, Clone)]
pub struct Formatters {
    pub number: NumberFormat,
    pub dates: DateFormat,
}

impl Formatters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            number: NumberFormat::from(&config.currency),
            dates: DateFormat::from(&config.dates),
        }
    }

    pub fn currency(&self, value: Option<f64>) -> String {
        self.number.format_currency(value)
    }

    pub fn date(&self, value: Option<&str>) -> String {
        self.dates.format_date(value, DateStyle::Short)
    }

    pub fn medium_date(&self, value: Option<&str>) -> String {
        self.dates.format_date(value, DateStyle::Medium)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnKind {
    Text,
    Currency,
    Number,
    Date,
    Badge,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(key: &'static str, label: &'static str, kind: ColumnKind) -> Self {
        Self { key, label, kind }
    }
}

fn badge_class(value: &str) -> &'static str {
    match value.to_lowercase().as_str() {
        "posted" | "in" | "matched" | "reconciled" => "bg-green-100 text-green-700",
        "draft" | "pending" | "adjustment" => "bg-yellow-100 text-yellow-700",
        "cancelled" | "out" | "unmatched" => "bg-red-100 text-red-700",
        _ => "bg-gray-100 text-gray-700",
    }
}

/// One table cell
pub fn cell(record: &Record, column: &Column, fmt: &Formatters) -> String {
    match column.kind {
        ColumnKind::Text => escape_html(&record.text(column.key).unwrap_or_default()),
        ColumnKind::Currency => fmt.currency(record.number(column.key)),
        ColumnKind::Number => fmt.number.format_number(record.number(column.key), 0),
        ColumnKind::Date => escape_html(&fmt.date(record.text(column.key).as_deref())),
        ColumnKind::Badge => match record.text(column.key) {
            Some(value) => format!(
                "<span class='px-2 py-1 rounded text-xs {}'>{}</span>",
                badge_class(&value),
                escape_html(&value)
            ),
            None => "-".to_string(),
        },
    }
}

fn sort_arrow(query: &TableQuery, key: &str) -> &'static str {
    match query.sort_direction(key) {
        Some(SortDirection::Ascending) => " ▲",
        Some(SortDirection::Descending) => " ▼",
        None => "",
    }
}

/// Render a derived page as a table with sortable headers and pager links.
/// `path` is the page URL the links point back to, `target` the element
/// HTMX swaps.
#[allow(clippy::too_many_arguments)]
pub fn table(
    page: &Page<Record>,
    columns: &[Column],
    query: &TableQuery,
    params: &Params,
    path: &str,
    target: &str,
    fmt: &Formatters,
    actions: Option<&dyn Fn(&Record) -> String>,
) -> String {
    let mut headers = String::new();
    for column in columns {
        let next = SortDescriptor::select(query.sort.as_ref(), column.key);
        let link = with_params(
            params,
            &[
                ("sort", next.key.clone()),
                ("dir", next.direction.to_string()),
            ],
        );
        let align = if matches!(column.kind, ColumnKind::Currency | ColumnKind::Number) { "text-right" } else { "text-left" };
        headers.push_str(&format!(
            "<th class='px-4 py-2 {} text-sm font-medium text-gray-600'><a href='{}?{}' hx-get='{}?{}' hx-target='{}' hx-push-url='true'>{}{}</a></th>",
            align, path, link, path, link, target, column.label, sort_arrow(query, column.key)
        ));
    }
    if actions.is_some() {
        headers.push_str("<th class='px-4 py-2'></th>");
    }

    let rows: Vec<String> = page
        .items
        .iter()
        .map(|record| {
            let mut row = String::from("<tr class='border-b hover:bg-gray-50'>");
            for column in columns {
                let align = if matches!(column.kind, ColumnKind::Currency | ColumnKind::Number) { "text-right" } else { "" };
                row.push_str(&format!("<td class='px-4 py-2 {}'>{}</td>", align, cell(record, column, fmt)));
            }
            if let Some(render) = actions {
                row.push_str(&format!("<td class='px-4 py-2 text-right whitespace-nowrap'>{}</td>", render(record)));
            }
            row.push_str("</tr>");
            row
        })
        .collect();

    let body = if rows.is_empty() {
        format!(
            "<tr><td colspan='{}' class='px-4 py-8 text-center text-gray-500'>No records match the current filters</td></tr>",
            columns.len() + usize::from(actions.is_some())
        )
    } else {
        rows.join("")
    };

    format!(
        r#"<div class='bg-white rounded-xl shadow-sm overflow-x-auto'>
            <table class='w-full'><thead class='bg-gray-50'><tr>{}</tr></thead><tbody>{}</tbody></table>
        </div>
        {}"#,
        headers,
        body,
        pager(page, params, path, target)
    )
}

/// Previous/next links plus the row range
pub fn pager<T>(page: &Page<T>, params: &Params, path: &str, target: &str) -> String {
    let link = |index: usize, label: &str, enabled: bool| -> String {
        if enabled {
            let query = with_params(params, &[("page", (index + 1).to_string())]);
            format!(
                "<a href='{}?{}' hx-get='{}?{}' hx-target='{}' hx-push-url='true' class='px-3 py-1 border rounded hover:bg-gray-100'>{}</a>",
                path, query, path, query, target, label
            )
        } else {
            format!("<span class='px-3 py-1 border rounded text-gray-300'>{}</span>", label)
        }
    };

    format!(
        "<div class='flex items-center justify-between mt-4 text-sm text-gray-600'>\
            <span>Showing {}-{} of {}</span>\
            <div class='flex items-center gap-2'>{}<span>Page {} of {}</span>{}</div>\
        </div>",
        page.first_row(),
        page.last_row(),
        format_count(page.total_count),
        link(page.page.saturating_sub(1), "Previous", page.has_previous()),
        if page.total_pages == 0 { 0 } else { page.page + 1 },
        page.total_pages,
        link(page.page + 1, "Next", page.has_next()),
    )
}

/// Text input that reloads the table as the user types
pub fn search_box(params: &Params, path: &str, target: &str, placeholder: &str) -> String {
    format!(
        "<input type='text' name='q' value='{}' placeholder='{}' hx-get='{}' hx-target='{}' hx-trigger='keyup changed delay:500ms' hx-include='closest form' class='px-4 py-2 border rounded-lg w-56'>",
        escape_html(params.get("q").map(String::as_str).unwrap_or("")),
        placeholder,
        path,
        target
    )
}

/// Select that filters the table on change; `"all"` clears it
pub fn select_filter(params: &Params, name: &str, label: &str, options: &[&str]) -> String {
    let current = params.get(name).map(String::as_str).unwrap_or("all");
    let mut html = format!(
        "<select name='{}' class='px-3 py-2 border rounded-lg' hx-trigger='change'><option value='all'>All {}</option>",
        name, label
    );
    for option in options {
        html.push_str(&format!(
            "<option value='{}' {}>{}</option>",
            escape_html(option),
            if *option == current { "selected" } else { "" },
            escape_html(option)
        ));
    }
    html.push_str("</select>");
    html
}

pub fn date_inputs(params: &Params) -> String {
    format!(
        "<input type='date' name='date_from' value='{}' class='px-3 py-2 border rounded-lg'>\
         <input type='date' name='date_to' value='{}' class='px-3 py-2 border rounded-lg'>",
        escape_html(params.get("date_from").map(String::as_str).unwrap_or("")),
        escape_html(params.get("date_to").map(String::as_str).unwrap_or(""))
    )
}

pub fn page_size_select(params: &Params, sizes: &[usize], default_size: usize) -> String {
    let current = params
        .get("page_size")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default_size);
    let options: String = sizes
        .iter()
        .map(|size| {
            format!(
                "<option value='{}' {}>{} / page</option>",
                size,
                if *size == current { "selected" } else { "" },
                size
            )
        })
        .collect();
    format!("<select name='page_size' class='px-3 py-2 border rounded-lg'>{}</select>", options)
}

/// Filter form wrapping the controls; every change reloads the table
pub fn filter_form(path: &str, target: &str, controls: &str) -> String {
    format!(
        "<form class='flex flex-wrap gap-2 mb-4' hx-get='{}' hx-target='{}' hx-trigger='change' hx-push-url='true'>{}\
         <a href='{}' class='px-3 py-2 text-gray-600 hover:text-gray-900'>Reset</a></form>",
        path, target, controls, path
    )
}

/// Banner for a failed refresh or partial fan-out
pub fn warnings(messages: &[String]) -> String {
    messages
        .iter()
        .map(|m| {
            format!(
                "<div class='mb-4 p-3 rounded-lg bg-red-50 border border-red-200 text-red-700 text-sm'>{}</div>",
                escape_html(m)
            )
        })
        .collect()
}

/// Small statistic card
pub fn stat_card(label: &str, value: &str, color: &str) -> String {
    format!(
        "<div class='bg-{c}-50 p-4 rounded-lg border border-{c}-200'><p class='text-sm text-{c}-600'>{}</p><p class='text-2xl font-bold text-{c}-700'>{}</p></div>",
        label,
        value,
        c = color
    )
}

/// Button for a destructive action; the browser asks before sending
/// `confirm=true`, then the content area reloads
pub fn confirm_button(method: &str, url: &str, label: &str, prompt: &str) -> String {
    format!(
        "<button hx-{}='{}?confirm=true' hx-confirm='{}' hx-swap='none' hx-on::after-request='if (event.detail.successful) htmx.ajax(\"GET\", window.location.href, \"#content\")' class='text-sm text-red-600 hover:text-red-800 ml-2'>{}</button>",
        method,
        url,
        escape_html(prompt),
        label
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpdash_core::table::paginate;
    use serde_json::json;

    fn fmt() -> Formatters {
        Formatters::from_config(&Config::default())
    }

    #[test]
    fn test_cells() {
        let record = Record::from_value(json!({
            "amount": "1234.5", "date": "2024-03-05T10:00:00Z", "status": "draft", "memo": "<b>"
        }))
        .unwrap();
        let f = fmt();
        assert_eq!(cell(&record, &Column::new("amount", "Amount", ColumnKind::Currency), &f), "$1,234.50");
        assert_eq!(cell(&record, &Column::new("missing", "X", ColumnKind::Currency), &f), "$0.00");
        assert_eq!(cell(&record, &Column::new("date", "Date", ColumnKind::Date), &f), "2024-03-05");
        assert_eq!(cell(&record, &Column::new("missing", "Date", ColumnKind::Date), &f), "-");
        assert_eq!(cell(&record, &Column::new("memo", "Memo", ColumnKind::Text), &f), "&lt;b&gt;");
        assert!(cell(&record, &Column::new("status", "Status", ColumnKind::Badge), &f).contains("yellow"));
    }

    #[test]
    fn test_pager_links() {
        let rows: Vec<u32> = (0..37).collect();
        let page = paginate(&rows, 1, 15);
        let html = pager(&page, &Params::new(), "/journals", "#table");
        assert!(html.contains("Showing 16-30 of 37"));
        assert!(html.contains("Page 2 of 3"));
        assert!(html.contains("/journals?page=1"));
        assert!(html.contains("/journals?page=3"));
    }

    #[test]
    fn test_empty_table_message() {
        let page = paginate::<Record>(&[], 0, 15);
        let html = table(
            &page,
            &[Column::new("id", "Id", ColumnKind::Text)],
            &TableQuery::default(),
            &Params::new(),
            "/products",
            "#table",
            &fmt(),
            None,
        );
        assert!(html.contains("No records match"));
        assert!(html.contains("Page 0 of 0"));
    }
}
