//! HTTP server with JSON endpoints and HTMX pages
//!
//! Routes are organized into modules:
//! - routes::accounts: Chart of accounts list and tree
//! - routes::journals: GL journals and their draft/posted/cancelled lifecycle
//! - routes::products: Product catalogue and inventory summary
//! - routes::movements: Stock movements, transfers and analytics
//! - routes::payments: Payment advices and invoice reconciliation
//! - routes::reports: Trial balance and profit & loss
//! - routes::settings: Configuration display

pub mod error;
pub mod params;
pub mod render;
pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::Local;
use erpdash_config::Config;
use erpdash_core::dashboard::dashboard_summary;
use erpdash_core::{ErpService, TrackedPage};
use erpdash_utils::{escape_html, format_count, format_percentage};
use std::sync::Arc;
use tokio::net::TcpListener;

pub use error::{ApiError, ApiResult};
use render::{stat_card, warnings, Formatters};

/// Element the HTMX links swap
pub const CONTENT_TARGET: &str = "#content";

/// Snapshot holders of the list pages
#[derive(Debug)]
pub struct Pages {
    pub accounts: TrackedPage,
    pub journals: TrackedPage,
    pub products: TrackedPage,
    pub movements: TrackedPage,
    pub payments: TrackedPage,
}

impl Pages {
    pub fn new() -> Self {
        Self {
            accounts: TrackedPage::new("accounts"),
            journals: TrackedPage::new("journals"),
            products: TrackedPage::new("products"),
            movements: TrackedPage::new("stock-movements"),
            payments: TrackedPage::new("payment-advices"),
        }
    }

    /// Abort every in-flight fetch
    pub fn cancel_all(&self) {
        for page in [&self.accounts, &self.journals, &self.products, &self.movements, &self.payments] {
            page.cancel();
        }
    }
}

impl Default for Pages {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub service: ErpService,
    pub config: Config,
    pub pages: Arc<Pages>,
    pub fmt: Arc<Formatters>,
}

impl AppState {
    pub fn new(config: Config, service: ErpService) -> Self {
        let fmt = Arc::new(Formatters::from_config(&config));
        Self {
            service,
            config,
            pages: Arc::new(Pages::new()),
            fmt,
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::accounts::{api_account_create, api_account_tree, api_accounts, page_accounts};
    use routes::journals::{
        api_journal_cancel, api_journal_create, api_journal_delete, api_journal_post,
        api_journal_update, api_journals, page_journals,
    };
    use routes::movements::{
        api_movement_analytics, api_movement_create, api_movement_delete, api_movement_update,
        api_movements, api_stock_transfer, page_movements,
    };
    use routes::payments::{
        api_advice_create, api_advice_delete, api_advice_update, api_advices, api_reconcile,
        page_advices,
    };
    use routes::products::{
        api_product_create, api_product_delete, api_product_summary, api_product_update,
        api_products, page_products,
    };
    use routes::reports::{
        api_profit_loss, api_trial_balance, page_profit_loss, page_trial_balance,
    };
    use routes::settings::{api_settings, page_settings};

    Router::new()
        // API endpoints
        .route("/api/health", get(health_check))
        .route("/api/settings", get(api_settings))
        .route("/api/dashboard", get(api_dashboard))
        .route("/api/accounts", get(api_accounts).post(api_account_create))
        .route("/api/accounts/tree", get(api_account_tree))
        .route("/api/journals", get(api_journals).post(api_journal_create))
        .route("/api/journals/:id", axum::routing::patch(api_journal_update).delete(api_journal_delete))
        .route("/api/journals/:id/post", post(api_journal_post))
        .route("/api/journals/:id/cancel", post(api_journal_cancel))
        .route("/api/reports/trial-balance", get(api_trial_balance))
        .route("/api/reports/profit-loss", get(api_profit_loss))
        .route("/api/products", get(api_products).post(api_product_create))
        .route("/api/products/summary", get(api_product_summary))
        .route("/api/products/:id", axum::routing::put(api_product_update).delete(api_product_delete))
        .route("/api/stock-movements", get(api_movements).post(api_movement_create))
        .route("/api/stock-movements/analytics", get(api_movement_analytics))
        .route("/api/stock-movements/transfer", post(api_stock_transfer))
        .route("/api/stock-movements/:id", axum::routing::put(api_movement_update).delete(api_movement_delete))
        .route("/api/payment-advices", get(api_advices).post(api_advice_create))
        .route("/api/payment-advices/:id", axum::routing::patch(api_advice_update).delete(api_advice_delete))
        .route("/api/reconcile", post(api_reconcile))
        // HTMX page routes
        .route("/", get(index_page))
        .route("/accounts", get(page_accounts))
        .route("/journals", get(page_journals))
        .route("/products", get(page_products))
        .route("/stock-movements", get(page_movements))
        .route("/payment-advices", get(page_advices))
        .route("/reports/trial-balance", get(page_trial_balance))
        .route("/reports/profit-loss", get(page_profit_loss))
        .route("/settings", get(page_settings))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Dashboard summary (JSON API)
async fn api_dashboard(
    state: axum::extract::State<AppState>,
) -> axum::Json<erpdash_core::dashboard::DashboardSummary> {
    let today = Local::now().date_naive();
    let summary = dashboard_summary(&state.service, today, state.config.analytics.movement_window_days).await;
    axum::Json(summary)
}

/// Wrap a mutation result as `{"success": true, "message": ..., "data": ...}`
pub fn success(message: &str, data: serde_json::Value) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": message,
        "data": data,
    }))
}

// ==================== Template Functions ====================

/// Base HTML template
pub fn base_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - ERP Dashboard</title>
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>
        .htmx-indicator {{ opacity: 0; transition: opacity 0.3s; }}
        .htmx-request .htmx-indicator {{ opacity: 1; }}
        .htmx-request.htmx-indicator {{ opacity: 1; }}
    </style>
</head>
<body class="bg-gray-50 text-gray-900">
    {}
</body>
</html>"#,
        escape_html(title),
        content
    )
}

/// Navigation sidebar
pub fn nav_sidebar(current_path: &str) -> String {
    let links = [
        ("/", "Dashboard", "dashboard"),
        ("/accounts", "Chart of Accounts", "accounts"),
        ("/journals", "GL Journals", "journals"),
        ("/reports/trial-balance", "Trial Balance", "trial-balance"),
        ("/reports/profit-loss", "Profit & Loss", "profit-loss"),
        ("/products", "Products", "products"),
        ("/stock-movements", "Stock Movements", "movements"),
        ("/payment-advices", "Payment Advices", "payments"),
        ("/settings", "Settings", "settings"),
    ];

    let mut nav = String::from("<div class='bg-white border-r h-screen flex flex-col'><div class='p-4 border-b'><h1 class='text-xl font-bold text-indigo-600'>ERP Dashboard</h1></div><ul class='flex-1 py-2 space-y-1 px-2'>");

    for (path, label, id) in &links {
        let is_active = if *path == "/" {
            current_path == "/"
        } else {
            current_path.starts_with(path)
        };
        let active_class = if is_active { "bg-indigo-50 text-indigo-600" } else { "text-gray-600 hover:bg-gray-50" };
        let icon = match *id {
            "dashboard" => "📊",
            "accounts" => "🗂️",
            "journals" => "📒",
            "trial-balance" | "profit-loss" => "📈",
            "products" => "📦",
            "movements" => "🚚",
            "payments" => "💳",
            "settings" => "⚙️",
            _ => "📄",
        };
        nav.push_str(&format!(
            r#"<li><a href='{}' class='flex items-center gap-2 px-3 py-2 rounded-lg {}'>{}<span>{}</span></a></li>"#,
            path, active_class, icon, label
        ));
    }
    nav.push_str("</ul></div>");
    nav
}

/// Check if request is from HTMX (partial page update)
fn is_htmx_request(headers: &axum::http::HeaderMap) -> bool {
    headers.get("hx-request").is_some()
}

/// Wrap content for a full page, or return it bare for an HTMX swap
pub fn page_response(headers: &axum::http::HeaderMap, title: &str, current_path: &str, inner_content: &str) -> String {
    if is_htmx_request(headers) {
        inner_content.to_string()
    } else {
        base_html(title, &format!(r#"<div class='flex flex-col h-screen'>
    <div class='flex flex-1 overflow-hidden'>
        <aside class='w-64 flex-shrink-0'>{}</aside>
        <main id='content' class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>
    </div>
</div>"#,
            nav_sidebar(current_path), inner_content))
    }
}

/// Index page: dashboard summary
async fn index_page(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
) -> axum::response::Html<String> {
    let today = Local::now().date_naive();
    let window = state.config.analytics.movement_window_days;
    let summary = dashboard_summary(&state.service, today, window).await;
    let fmt = &state.fmt;

    let dash = "-".to_string();
    let journals = summary.journals.as_ref();
    let inventory = summary.inventory.as_ref();
    let movements = summary.movements.as_ref();

    let cards = [
        stat_card("Accounts", &summary.account_count.map(format_count).unwrap_or_else(|| dash.clone()), "indigo"),
        stat_card("Draft journals", &journals.map(|j| format_count(j.draft)).unwrap_or_else(|| dash.clone()), "yellow"),
        stat_card("Posted debits", &journals.map(|j| fmt.currency(Some(j.posted_debit))).unwrap_or_else(|| dash.clone()), "green"),
        stat_card("Stock value", &inventory.map(|i| fmt.currency(Some(i.total_stock_value))).unwrap_or_else(|| dash.clone()), "blue"),
        stat_card("Low stock", &inventory.map(|i| format_count(i.low_stock_count)).unwrap_or_else(|| dash.clone()), "red"),
        stat_card(
            &format!("Net movement ({} days)", window),
            &movements.map(|m| fmt.number.format_number(Some(m.net_change), 0)).unwrap_or_else(|| dash.clone()),
            "purple",
        ),
    ]
    .join("");

    let categories: String = inventory
        .map(|i| {
            i.by_category
                .iter()
                .map(|c| {
                    format!(
                        "<div class='flex justify-between py-2 border-b'><span>{}</span><span class='font-medium'>{} <span class='text-gray-400 text-sm'>{}</span></span></div>",
                        escape_html(&c.category),
                        fmt.currency(Some(c.stock_value)),
                        format_percentage(Some(c.percentage))
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let unbalanced: String = journals
        .map(|j| {
            if j.unbalanced_drafts.is_empty() {
                "<p class='text-gray-500'>All drafts balance</p>".to_string()
            } else {
                j.unbalanced_drafts
                    .iter()
                    .map(|n| format!("<div class='py-1 text-red-600'>{}</div>", escape_html(n)))
                    .collect()
            }
        })
        .unwrap_or_default();

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Dashboard</h2><p class='text-gray-500'>As of {}</p></div>
        {}
        <div class='grid grid-cols-1 md:grid-cols-3 lg:grid-cols-6 gap-4 mb-6'>{}</div>
        <div class='grid grid-cols-1 lg:grid-cols-2 gap-6'>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Stock value by category</h3>
                <div class='space-y-1'>{}</div>
            </div>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Unbalanced drafts</h3>
                <div>{}</div>
            </div>
        </div>"#,
        fmt.medium_date(Some(&today.to_string())),
        warnings(&summary.warnings),
        cards,
        categories,
        unbalanced
    );

    axum::response::Html(page_response(&headers, "Dashboard", "/", &inner_content))
}

/// Wait for Ctrl-C, then cancel the page sessions
async fn shutdown_signal(pages: Arc<Pages>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    log::info!("Shutdown requested, cancelling in-flight fetches");
    pages.cancel_all();
}

/// Start the HTTP server
///
/// Binds to the configured address and serves until Ctrl-C.
pub async fn start_server(config: Config, service: ErpService) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let upstream = config.base_url();
    let state = AppState::new(config, service);
    let pages = state.pages.clone();

    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    log::info!("Starting ERP dashboard on http://{}", addr);
    log::info!("Upstream API: {}", upstream);
    log::info!("Pages: /, /accounts, /journals, /products, /stock-movements, /payment-advices, /reports/*");
    log::info!("JSON API: /api/*");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(pages))
        .await?;
    log::info!("Server stopped gracefully");
    Ok(())
}
