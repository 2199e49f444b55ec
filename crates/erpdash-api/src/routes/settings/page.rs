//! Settings page rendering - Full page endpoints

use erpdash_utils::escape_html;

use crate::AppState;

fn setting(label: &str, value: &str) -> String {
    format!(
        "<div><p class='text-sm text-gray-500'>{}</p><p class='font-medium'>{}</p></div>",
        label,
        escape_html(value)
    )
}

fn section(title: &str, items: &[String]) -> String {
    format!(
        "<div class='bg-white rounded-xl shadow-sm p-6 mb-6'><h3 class='text-lg font-semibold mb-4'>{}</h3><div class='grid grid-cols-2 gap-4'>{}</div></div>",
        title,
        items.join("")
    )
}

pub async fn page_settings(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
) -> axum::response::Html<String> {
    let config = &state.config;
    let fmt = &state.fmt;

    let page_sizes = config
        .pagination
        .page_sizes
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let inner_content = format!(
        "<div class='mb-6'><h2 class='text-2xl font-bold'>Settings</h2></div>{}{}{}{}",
        section(
            "Server",
            &[
                setting("Host", &config.server.host),
                setting("Port", &config.server.port.to_string()),
            ]
        ),
        section(
            "Upstream ERP",
            &[
                setting("Base URL", &config.base_url()),
                setting("Timeout", &format!("{} s", config.upstream.timeout_secs)),
                setting("Follow pagination", if config.upstream.follow_pagination { "Enabled" } else { "Disabled" }),
            ]
        ),
        section(
            "Tables",
            &[
                setting("Page sizes", &page_sizes),
                setting("Default page size", &config.pagination.default_page_size.to_string()),
                setting("Movement window", &format!("{} days", config.analytics.movement_window_days)),
            ]
        ),
        section(
            "Formatting",
            &[
                setting("Currency sample", &fmt.currency(Some(1234567.891))),
                setting("Short date", &fmt.date(Some("2024-03-05"))),
                setting("Medium date", &fmt.medium_date(Some("2024-03-05"))),
                setting("Log level", &config.logging.level),
            ]
        ),
    );

    axum::response::Html(crate::page_response(&headers, "Settings", "/settings", &inner_content))
}
