//! Typed operations over an [`ErpSource`]
//!
//! Request payloads are validated before anything is sent, and responses
//! are decoded into the schemas in [`crate::models`].

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::aggregate::{self, InventorySummary, JournalSummary, MovementAnalytics};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    Account, GlJournal, JournalStatus, MovementInput, NewAccount, NewJournal, PaymentAdvice,
    Product, ProductInput, ProfitLoss, ReconcileRequest, StockMovement, StockTransfer, TrialBalance,
};
use crate::record::{decode_all, Record};
use crate::source::{DocumentUpload, ErpSource, Method, Resource};
use crate::tree::{prune, TreeBuilder, TreeNode};

pub const TRIAL_BALANCE_PATH: &str = "finance/trial-balance/";
pub const PROFIT_LOSS_PATH: &str = "finance/profit-loss/";
pub const RECONCILE_PATH: &str = "reconcile/invoice-numbers/";

/// Fields matched by the chart-of-accounts search
pub const ACCOUNT_SEARCH_FIELDS: [&str; 2] = ["account_code", "account_name"];

fn to_body<T: Serialize>(value: &T) -> CoreResult<Value> {
    serde_json::to_value(value).map_err(|e| CoreError::Internal {
        message: e.to_string(),
    })
}

fn decode_one<T: serde::de::DeserializeOwned>(value: Value, schema: &str) -> CoreResult<T> {
    serde_json::from_value(value).map_err(|e| CoreError::Decode {
        schema: schema.to_string(),
        message: e.to_string(),
    })
}

/// Dashboard operations against the ERP API
#[derive(Clone)]
pub struct ErpService {
    source: Arc<dyn ErpSource>,
}

impl ErpService {
    pub fn new(source: Arc<dyn ErpSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn ErpSource> {
        &self.source
    }

    /// Raw records of a collection
    pub async fn records(&self, resource: Resource) -> CoreResult<Vec<Record>> {
        self.source.list(resource, &[]).await
    }

    // ==================== Accounts ====================

    pub async fn accounts(&self) -> CoreResult<Vec<Account>> {
        let records = self.records(Resource::Accounts).await?;
        decode_all(&records, "Account")
    }

    /// Chart of accounts as a forest. With a search term, only matching
    /// accounts and their ancestors remain.
    pub async fn account_tree(&self, search: Option<&str>) -> CoreResult<Vec<TreeNode>> {
        let records = self.records(Resource::Accounts).await?;
        build_account_tree(records, search)
    }

    pub async fn create_account(&self, account: &NewAccount) -> CoreResult<Value> {
        account.validate()?;
        self.source
            .send(Method::Post, Resource::Accounts.path(), Some(to_body(account)?))
            .await
    }

    // ==================== Journals ====================

    pub async fn journals(&self) -> CoreResult<Vec<GlJournal>> {
        let records = self.records(Resource::Journals).await?;
        decode_all(&records, "GlJournal")
    }

    pub async fn journal(&self, id: i64) -> CoreResult<GlJournal> {
        let value = self
            .source
            .fetch(&Resource::Journals.item_path(id), &[])
            .await?;
        decode_one(value, "GlJournal")
    }

    pub async fn create_journal(&self, journal: &NewJournal) -> CoreResult<Value> {
        journal.validate()?;
        self.source
            .send(Method::Post, Resource::Journals.path(), Some(to_body(journal)?))
            .await
    }

    /// Only drafts can be edited
    pub async fn update_journal(&self, id: i64, journal: &NewJournal) -> CoreResult<Value> {
        journal.validate()?;
        self.require_status(id, JournalStatus::is_editable, "edited").await?;
        self.source
            .send(Method::Patch, &Resource::Journals.item_path(id), Some(to_body(journal)?))
            .await
    }

    pub async fn delete_journal(&self, id: i64) -> CoreResult<()> {
        self.require_status(id, JournalStatus::is_editable, "deleted").await?;
        self.source
            .send(Method::Delete, &Resource::Journals.item_path(id), None)
            .await
            .map(|_| ())
    }

    /// draft -> posted
    pub async fn post_journal(&self, id: i64) -> CoreResult<Value> {
        self.require_status(id, JournalStatus::can_post, "posted").await?;
        self.source
            .send(Method::Post, &Resource::Journals.action_path(id, "post_journal"), None)
            .await
    }

    /// posted -> cancelled
    pub async fn cancel_journal(&self, id: i64) -> CoreResult<Value> {
        self.require_status(id, JournalStatus::can_cancel, "cancelled").await?;
        self.source
            .send(Method::Post, &Resource::Journals.action_path(id, "cancel_journal"), None)
            .await
    }

    async fn require_status(
        &self,
        id: i64,
        allowed: fn(&JournalStatus) -> bool,
        action: &str,
    ) -> CoreResult<()> {
        let journal = self.journal(id).await?;
        if allowed(&journal.status) {
            Ok(())
        } else {
            Err(CoreError::Validation {
                message: format!(
                    "Journal {} is {} and cannot be {}",
                    journal.journal_number, journal.status, action
                ),
            })
        }
    }

    pub async fn journal_summary(&self) -> CoreResult<JournalSummary> {
        Ok(aggregate::journal_summary(&self.journals().await?))
    }

    // ==================== Reports ====================

    pub async fn trial_balance(&self, as_of_date: Option<NaiveDate>) -> CoreResult<TrialBalance> {
        let query: Vec<(String, String)> = as_of_date
            .map(|d| vec![("as_of_date".to_string(), d.to_string())])
            .unwrap_or_default();
        let value = self.source.fetch(TRIAL_BALANCE_PATH, &query).await?;
        decode_one(value, "TrialBalance")
    }

    pub async fn profit_loss(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> CoreResult<ProfitLoss> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(CoreError::InvalidQuery {
                    param: "start_date".to_string(),
                    reason: "must not be after end_date".to_string(),
                });
            }
        }
        let mut query = Vec::new();
        if let Some(start) = start_date {
            query.push(("start_date".to_string(), start.to_string()));
        }
        if let Some(end) = end_date {
            query.push(("end_date".to_string(), end.to_string()));
        }
        let value = self.source.fetch(PROFIT_LOSS_PATH, &query).await?;
        decode_one(value, "ProfitLoss")
    }

    // ==================== Products ====================

    pub async fn products(&self) -> CoreResult<Vec<Product>> {
        let records = self.records(Resource::Products).await?;
        decode_all(&records, "Product")
    }

    pub async fn create_product(&self, product: &ProductInput) -> CoreResult<Value> {
        product.validate()?;
        self.source
            .send(Method::Post, Resource::Products.path(), Some(to_body(product)?))
            .await
    }

    pub async fn update_product(&self, id: i64, product: &ProductInput) -> CoreResult<Value> {
        product.validate()?;
        self.source
            .send(Method::Put, &Resource::Products.item_path(id), Some(to_body(product)?))
            .await
    }

    pub async fn delete_product(&self, id: i64) -> CoreResult<()> {
        self.delete(Resource::Products, id).await
    }

    pub async fn inventory_summary(&self) -> CoreResult<InventorySummary> {
        Ok(aggregate::inventory_summary(&self.products().await?))
    }

    // ==================== Stock movements ====================

    pub async fn movements(&self) -> CoreResult<Vec<StockMovement>> {
        let records = self.records(Resource::StockMovements).await?;
        decode_all(&records, "StockMovement")
    }

    pub async fn create_movement(&self, movement: &MovementInput) -> CoreResult<Value> {
        movement.validate()?;
        self.source
            .send(Method::Post, Resource::StockMovements.path(), Some(to_body(movement)?))
            .await
    }

    pub async fn update_movement(&self, id: i64, movement: &MovementInput) -> CoreResult<Value> {
        movement.validate()?;
        self.source
            .send(Method::Put, &Resource::StockMovements.item_path(id), Some(to_body(movement)?))
            .await
    }

    pub async fn delete_movement(&self, id: i64) -> CoreResult<()> {
        self.delete(Resource::StockMovements, id).await
    }

    pub async fn transfer_stock(&self, transfer: &StockTransfer) -> CoreResult<Value> {
        transfer.validate()?;
        self.source
            .send(
                Method::Post,
                &Resource::StockMovements.collection_action_path("stock_transfer"),
                Some(to_body(transfer)?),
            )
            .await
    }

    pub async fn movement_analytics(
        &self,
        end: NaiveDate,
        window_days: Option<u32>,
    ) -> CoreResult<MovementAnalytics> {
        let movements = self.movements().await?;
        Ok(aggregate::movement_analytics(&movements, end, window_days))
    }

    // ==================== Payment advices ====================

    pub async fn payment_advices(&self) -> CoreResult<Vec<PaymentAdvice>> {
        let records = self.records(Resource::PaymentAdvices).await?;
        decode_all(&records, "PaymentAdvice")
    }

    pub async fn create_payment_advice(
        &self,
        fields: Vec<(String, String)>,
        document: Option<DocumentUpload>,
    ) -> CoreResult<Value> {
        validate_advice_fields(&fields, true)?;
        self.source
            .upload(Method::Post, Resource::PaymentAdvices.path(), fields, document)
            .await
    }

    pub async fn update_payment_advice(
        &self,
        id: i64,
        fields: Vec<(String, String)>,
        document: Option<DocumentUpload>,
    ) -> CoreResult<Value> {
        validate_advice_fields(&fields, false)?;
        self.source
            .upload(Method::Patch, &Resource::PaymentAdvices.item_path(id), fields, document)
            .await
    }

    pub async fn delete_payment_advice(&self, id: i64) -> CoreResult<()> {
        self.delete(Resource::PaymentAdvices, id).await
    }

    pub async fn reconcile(&self, request: &ReconcileRequest) -> CoreResult<Value> {
        request.validate()?;
        let request = request.normalized();
        self.source
            .send(Method::Post, RECONCILE_PATH, Some(to_body(&request)?))
            .await
    }

    async fn delete(&self, resource: Resource, id: i64) -> CoreResult<()> {
        self.source
            .send(Method::Delete, &resource.item_path(id), None)
            .await
            .map(|_| ())
    }
}

/// Build the chart-of-accounts forest, optionally pruned to a search term
pub fn build_account_tree(records: Vec<Record>, search: Option<&str>) -> CoreResult<Vec<TreeNode>> {
    let forest = TreeBuilder::for_accounts().build(records)?;
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(forest),
        Some(term) => {
            let needle = term.to_lowercase();
            Ok(prune(&forest, &|record: &Record| {
                ACCOUNT_SEARCH_FIELDS.iter().any(|field| {
                    record
                        .text(field)
                        .map(|v| v.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            }))
        }
    }
}

/// Multipart advice forms must carry an amount that parses; new advices
/// also need a customer
fn validate_advice_fields(fields: &[(String, String)], creating: bool) -> CoreResult<()> {
    let field = |name: &str| {
        fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.trim())
    };
    if creating && field("customer").map_or(true, str::is_empty) {
        return Err(CoreError::Validation {
            message: "Customer is required".to_string(),
        });
    }
    match field("amount") {
        Some(amount) => match amount.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(()),
            _ => Err(CoreError::Validation {
                message: "Amount must be a positive number".to_string(),
            }),
        },
        None if creating => Err(CoreError::Validation {
            message: "Amount is required".to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory source that records every mutating call
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub lists: HashMap<&'static str, Vec<Value>>,
        pub documents: HashMap<String, Value>,
        pub failing: Vec<&'static str>,
        pub calls: Mutex<Vec<(Method, String, Option<Value>)>>,
    }

    impl FakeSource {
        pub fn with_list(mut self, resource: Resource, values: Vec<Value>) -> Self {
            self.lists.insert(resource.path(), values);
            self
        }

        pub fn with_document(mut self, path: &str, value: Value) -> Self {
            self.documents.insert(path.to_string(), value);
            self
        }

        pub fn failing(mut self, resource: Resource) -> Self {
            self.failing.push(resource.path());
            self
        }

        pub fn calls(&self) -> Vec<(Method, String, Option<Value>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ErpSource for FakeSource {
        async fn list(&self, resource: Resource, _query: &[(String, String)]) -> CoreResult<Vec<Record>> {
            if self.failing.contains(&resource.path()) {
                return Err(CoreError::Network {
                    message: "connection refused".to_string(),
                });
            }
            Record::from_values(self.lists.get(resource.path()).cloned().unwrap_or_default())
        }

        async fn fetch(&self, path: &str, _query: &[(String, String)]) -> CoreResult<Value> {
            self.documents.get(path).cloned().ok_or_else(|| CoreError::Api {
                status: 404,
                message: "Not found.".to_string(),
            })
        }

        async fn send(&self, method: Method, path: &str, body: Option<Value>) -> CoreResult<Value> {
            self.calls.lock().unwrap().push((method, path.to_string(), body));
            Ok(json!({"ok": true}))
        }

        async fn upload(
            &self,
            method: Method,
            path: &str,
            fields: Vec<(String, String)>,
            _document: Option<DocumentUpload>,
        ) -> CoreResult<Value> {
            let body = json!(fields.into_iter().collect::<HashMap<_, _>>());
            self.calls.lock().unwrap().push((method, path.to_string(), Some(body)));
            Ok(json!({"ok": true}))
        }
    }

    fn service(source: FakeSource) -> (ErpService, Arc<FakeSource>) {
        let source = Arc::new(source);
        (ErpService::new(source.clone()), source)
    }

    fn accounts() -> Vec<Value> {
        vec![
            json!({"id": 1, "parent_account": null, "account_code": "1000", "account_name": "Assets"}),
            json!({"id": 2, "parent_account": 1, "account_code": "1010", "account_name": "Cash"}),
            json!({"id": 3, "parent_account": 1, "account_code": "1200", "account_name": "Receivables"}),
            json!({"id": 4, "parent_account": null, "account_code": "4000", "account_name": "Revenue"}),
        ]
    }

    #[tokio::test]
    async fn test_account_tree_search_keeps_ancestors() {
        let (service, _) = service(FakeSource::default().with_list(Resource::Accounts, accounts()));

        let full = service.account_tree(None).await.unwrap();
        assert_eq!(full.len(), 2);

        let pruned = service.account_tree(Some("cash")).await.unwrap();
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].record.text("account_code").as_deref(), Some("1000"));
        assert_eq!(pruned[0].children.len(), 1);
        assert_eq!(pruned[0].children[0].record.text("account_name").as_deref(), Some("Cash"));
    }

    #[tokio::test]
    async fn test_unbalanced_journal_never_sent() {
        let (service, source) = service(FakeSource::default());
        let journal: NewJournal = serde_json::from_value(json!({
            "date": "2024-01-31",
            "description": "Rent",
            "lines": [
                {"account": 1, "debit": 500, "credit": 0},
                {"account": 2, "debit": 0, "credit": 400}
            ]
        }))
        .unwrap();

        let err = service.create_journal(&journal).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_post_journal_checks_status() {
        let source = FakeSource::default()
            .with_document(
                "api/gl-journals/1/",
                json!({"id": 1, "journal_number": "JV-001", "status": "draft"}),
            )
            .with_document(
                "api/gl-journals/2/",
                json!({"id": 2, "journal_number": "JV-002", "status": "posted"}),
            );
        let (service, source) = service(source);

        service.post_journal(1).await.unwrap();
        let err = service.post_journal(2).await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Journal JV-002 is posted and cannot be posted");

        service.cancel_journal(2).await.unwrap();
        let calls = source.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, "api/gl-journals/1/post_journal/");
        assert_eq!(calls[1].1, "api/gl-journals/2/cancel_journal/");
    }

    #[tokio::test]
    async fn test_transfer_goes_to_collection_action() {
        let (service, source) = service(FakeSource::default());
        let transfer = StockTransfer {
            product: 3,
            from_warehouse: "Main".to_string(),
            to_warehouse: "East".to_string(),
            quantity: 2.0,
            notes: None,
        };
        service.transfer_stock(&transfer).await.unwrap();
        let calls = source.calls();
        assert_eq!(calls[0].0, Method::Post);
        assert_eq!(calls[0].1, "api/stock-movements/stock_transfer/");
    }

    #[tokio::test]
    async fn test_reconcile_sends_normalized_numbers() {
        let (service, source) = service(FakeSource::default());
        let request = ReconcileRequest {
            customer: "ACME".to_string(),
            invoice_numbers: vec!["INV-1 ".into(), "INV-1".into()],
        };
        service.reconcile(&request).await.unwrap();
        let body = source.calls()[0].2.clone().unwrap();
        assert_eq!(body["invoice_numbers"], json!(["INV-1"]));
    }

    #[tokio::test]
    async fn test_profit_loss_rejects_inverted_range() {
        let (service, _) = service(FakeSource::default());
        let err = service
            .profit_loss(NaiveDate::from_ymd_opt(2024, 2, 1), NaiveDate::from_ymd_opt(2024, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuery { .. }));
    }

    #[tokio::test]
    async fn test_decode_failure_is_typed() {
        let (service, _) = service(
            FakeSource::default().with_list(Resource::Products, vec![json!({"id": 1, "name": "A", "unit_price": "abc"})]),
        );
        let err = service.products().await.unwrap_err();
        assert!(matches!(err, CoreError::Decode { ref schema, .. } if schema == "Product"));
    }

    #[test]
    fn test_advice_field_validation() {
        let fields = |pairs: &[(&str, &str)]| -> Vec<(String, String)> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        assert!(validate_advice_fields(&fields(&[("customer", "ACME"), ("amount", "10.00")]), true).is_ok());
        assert!(validate_advice_fields(&fields(&[("amount", "10.00")]), true).is_err());
        assert!(validate_advice_fields(&fields(&[("customer", "ACME"), ("amount", "-1")]), true).is_err());
        assert!(validate_advice_fields(&fields(&[("status", "matched")]), false).is_ok());
    }
}
