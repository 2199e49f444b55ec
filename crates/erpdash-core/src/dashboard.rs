//! Concurrent fan-out for pages that need more than one collection
//!
//! Each branch fails on its own: a failed branch leaves its section empty
//! and adds a warning, the rest of the page still renders.

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{self, InventorySummary, JournalSummary, MovementAnalytics};
use crate::error::{CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::models::Account;
use crate::service::ErpService;
use crate::session::TrackedPage;
use crate::source::Resource;
use crate::view::PageState;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub as_of: NaiveDate,
    pub account_count: Option<usize>,
    pub journals: Option<JournalSummary>,
    pub inventory: Option<InventorySummary>,
    pub movements: Option<MovementAnalytics>,
    pub warnings: Vec<String>,
}

fn keep<T>(result: CoreResult<T>, section: &str, warnings: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            DefaultErrorLogger.log_error(&e, &ErrorContext::new(format!("load {}", section)).with_page("dashboard"));
            warnings.push(format!("Could not load {}: {}", section, e));
            None
        }
    }
}

/// Load every dashboard section concurrently
pub async fn dashboard_summary(
    service: &ErpService,
    as_of: NaiveDate,
    movement_window_days: u32,
) -> DashboardSummary {
    let (accounts, journals, products, movements) = tokio::join!(
        service.records(Resource::Accounts),
        service.journals(),
        service.products(),
        service.movements(),
    );

    let mut warnings = Vec::new();
    let account_count = keep(accounts.map(|a| a.len()), Resource::Accounts.label(), &mut warnings);
    let journals = keep(journals, Resource::Journals.label(), &mut warnings)
        .map(|j| aggregate::journal_summary(&j));
    let inventory = keep(products, Resource::Products.label(), &mut warnings)
        .map(|p| aggregate::inventory_summary(&p));
    let movements = keep(movements, Resource::StockMovements.label(), &mut warnings)
        .map(|m| aggregate::movement_analytics(&m, as_of, Some(movement_window_days)));

    DashboardSummary {
        as_of,
        account_count,
        journals,
        inventory,
        movements,
        warnings,
    }
}

/// Journal list plus the accounts for the line-item account picker
#[derive(Debug, Clone, Serialize)]
pub struct JournalPageData {
    pub state: PageState,
    pub accounts: Vec<Account>,
    pub warnings: Vec<String>,
}

/// Refresh the journal page and load accounts at the same time
pub async fn journal_page(service: &ErpService, page: &TrackedPage) -> JournalPageData {
    let (journals, accounts) = tokio::join!(
        page.refresh(service.records(Resource::Journals)),
        service.accounts(),
    );

    let mut warnings = Vec::new();
    let state = match journals {
        Ok(state) => state,
        Err(e) => {
            warnings.push(format!("Could not load journals: {}", e));
            let snapshot = page.snapshot().await;
            if snapshot.has_loaded() {
                DefaultErrorLogger.log_warning(
                    "serving previous journals",
                    &ErrorContext::new("journal page")
                        .with_page(page.session().name())
                        .with_sequence(page.session().current_sequence()),
                );
            }
            snapshot
        }
    };
    let accounts = keep(accounts, Resource::Accounts.label(), &mut warnings).unwrap_or_default();

    JournalPageData {
        state,
        accounts,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::FakeSource;
    use serde_json::json;
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_collects_all_sections() {
        let source = FakeSource::default()
            .with_list(Resource::Accounts, vec![json!({"id": 1, "account_code": "1000", "account_name": "Cash"})])
            .with_list(
                Resource::Journals,
                vec![json!({"id": 1, "journal_number": "JV-1", "status": "posted", "total_debit": 5, "total_credit": 5})],
            )
            .with_list(Resource::Products, vec![json!({"id": 1, "name": "Bolt", "unit_price": 1, "quantity_on_hand": 3})])
            .with_list(
                Resource::StockMovements,
                vec![json!({"id": 1, "movement_type": "in", "quantity": 3, "date": "2024-01-09"})],
            );
        let service = ErpService::new(Arc::new(source));

        let summary = dashboard_summary(&service, today(), 30).await;
        assert!(summary.warnings.is_empty());
        assert_eq!(summary.account_count, Some(1));
        assert_eq!(summary.journals.unwrap().posted, 1);
        assert_eq!(summary.inventory.unwrap().total_stock_value, 3.0);
        assert_eq!(summary.movements.unwrap().total_inbound, 3.0);
    }

    #[tokio::test]
    async fn test_failed_branch_becomes_warning() {
        let source = FakeSource::default()
            .with_list(Resource::Accounts, vec![json!({"id": 1, "account_code": "1000", "account_name": "Cash"})])
            .failing(Resource::Products);
        let service = ErpService::new(Arc::new(source));

        let summary = dashboard_summary(&service, today(), 30).await;
        assert_eq!(summary.account_count, Some(1));
        assert!(summary.inventory.is_none());
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("products"));
        assert!(summary.journals.is_some());
    }

    #[tokio::test]
    async fn test_journal_page_keeps_snapshot_on_failure() {
        let source = FakeSource::default()
            .with_list(Resource::Accounts, vec![json!({"id": 1, "account_code": "1000", "account_name": "Cash"})])
            .failing(Resource::Journals);
        let service = ErpService::new(Arc::new(source));
        let page = TrackedPage::new("journals");

        let data = journal_page(&service, &page).await;
        assert_eq!(data.accounts.len(), 1);
        assert_eq!(data.warnings.len(), 1);
        assert!(data.state.records.is_empty());
        assert!(data.state.error.is_some());
        assert!(!data.state.loading);
    }
}
