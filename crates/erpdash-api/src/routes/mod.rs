//! Route modules for the API server
//!
//! - accounts: Chart of accounts table and tree
//! - journals: GL journals and their lifecycle actions
//! - products: Product catalogue and inventory summary
//! - movements: Stock movements, transfers, analytics
//! - payments: Payment advices and reconciliation
//! - reports: Trial balance and profit & loss
//! - settings: Settings page
//!
//! Each module follows a consistent structure:
//! - mod.rs: Module declaration and exports
//! - api.rs: JSON API endpoints
//! - page.rs: HTMX page rendering

pub mod accounts;
pub mod journals;
pub mod movements;
pub mod payments;
pub mod products;
pub mod reports;
pub mod settings;

use erpdash_core::error::{DefaultErrorLogger, ErrorContext, ErrorLogger};
use erpdash_core::{CoreResult, PageState, Record, TableQuery, TableView, TrackedPage};
use serde_json::Value;
use std::future::Future;

use crate::error::ApiResult;

/// Refresh a list page. When the fetch fails but an earlier one succeeded,
/// the previous records are served with the error attached.
pub async fn load_page<F>(page: &TrackedPage, fetch: F) -> ApiResult<PageState>
where
    F: Future<Output = CoreResult<Vec<Record>>>,
{
    match page.refresh(fetch).await {
        Ok(state) => Ok(state),
        Err(e) => {
            let snapshot = page.snapshot().await;
            if snapshot.has_loaded() {
                DefaultErrorLogger.log_warning(
                    &format!("serving previous snapshot after: {}", e),
                    &ErrorContext::new("load page")
                        .with_page(page.session().name())
                        .with_sequence(page.session().current_sequence()),
                );
                Ok(snapshot)
            } else {
                Err(e.into())
            }
        }
    }
}

/// JSON body of a derived table
pub fn table_json(view: &TableView, query: &TableQuery) -> Value {
    serde_json::json!({
        "items": view.page.items,
        "page": view.page.page + 1,
        "page_size": view.page.page_size,
        "total_count": view.page.total_count,
        "total_pages": view.page.total_pages,
        "source_count": view.source_count,
        "active_filters": query.filters.active_count(),
        "sort": query.sort,
        "error": view.error,
    })
}
