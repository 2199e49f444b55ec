//! Router tests against an in-memory ERP source

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use erpdash_api::{create_router, AppState};
use erpdash_config::Config;
use erpdash_core::{CoreError, CoreResult, DocumentUpload, ErpService, ErpSource, Method, Record, Resource};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Default)]
struct MemorySource {
    lists: HashMap<&'static str, Vec<Value>>,
    documents: HashMap<String, Value>,
    offline: AtomicBool,
    send_error: Option<(u16, String)>,
    calls: Mutex<Vec<(Method, String)>>,
}

impl MemorySource {
    fn with_list(mut self, resource: Resource, values: Vec<Value>) -> Self {
        self.lists.insert(resource.path(), values);
        self
    }

    fn with_document(mut self, path: &str, value: Value) -> Self {
        self.documents.insert(path.to_string(), value);
        self
    }

    fn rejecting_sends(mut self, status: u16, message: &str) -> Self {
        self.send_error = Some((status, message.to_string()));
        self
    }

    fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, method: Method, path: &str) -> CoreResult<Value> {
        self.calls.lock().unwrap().push((method, path.to_string()));
        match &self.send_error {
            Some((status, message)) => Err(CoreError::Api {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(json!({"id": 99})),
        }
    }
}

#[async_trait]
impl ErpSource for MemorySource {
    async fn list(&self, resource: Resource, _query: &[(String, String)]) -> CoreResult<Vec<Record>> {
        if self.offline.load(Ordering::SeqCst) {
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

    async fn send(&self, method: Method, path: &str, _body: Option<Value>) -> CoreResult<Value> {
        self.record_call(method, path)
    }

    async fn upload(
        &self,
        method: Method,
        path: &str,
        _fields: Vec<(String, String)>,
        _document: Option<DocumentUpload>,
    ) -> CoreResult<Value> {
        self.record_call(method, path)
    }
}

fn journals() -> Vec<Value> {
    vec![
        json!({"id": 1, "journal_number": "JV-001", "date": "2024-01-05", "description": "Rent", "status": "draft", "total_debit": "500.00", "total_credit": "500.00"}),
        json!({"id": 2, "journal_number": "JV-002", "date": "2024-01-06", "description": "Sales", "status": "posted", "total_debit": "1200.00", "total_credit": "1200.00"}),
        json!({"id": 3, "journal_number": "JV-003", "date": "2024-01-07", "description": "Payroll", "status": "draft", "total_debit": "900.00", "total_credit": "900.00"}),
        json!({"id": 4, "journal_number": "JV-004", "date": "2024-01-08", "description": "Refund", "status": "cancelled", "total_debit": "50.00", "total_credit": "50.00"}),
    ]
}

fn products(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|i| json!({"id": i, "sku": format!("SKU-{:03}", i), "name": format!("Item {:03}", i), "unit_price": "2.50", "quantity_on_hand": i, "reorder_level": 5}))
        .collect()
}

fn app(source: MemorySource) -> (Router, Arc<MemorySource>) {
    let source = Arc::new(source);
    let service = ErpService::new(source.clone());
    (create_router(AppState::new(Config::default(), service)), source)
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn page(router: &Router, uri: &str, htmx: bool) -> (StatusCode, String) {
    let mut builder = Request::builder().uri(uri);
    if htmx {
        builder = builder.header("hx-request", "true");
    }
    let response = router.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn test_health() {
    let (router, _) = app(MemorySource::default());
    let (status, body) = send(&router, "GET", "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_journal_status_filter_and_default_sort() {
    let (router, _) = app(MemorySource::default().with_list(Resource::Journals, journals()));

    let (status, body) = send(&router, "GET", "/api/journals?status=draft").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["source_count"], 4);
    // newest first
    assert_eq!(body["items"][0]["journal_number"], "JV-003");
    assert_eq!(body["items"][1]["journal_number"], "JV-001");

    let (_, body) = send(&router, "GET", "/api/journals?status=all&q=payroll").await;
    assert_eq!(body["total_count"], 1);
}

#[tokio::test]
async fn test_amount_sort_is_numeric() {
    let (router, _) = app(MemorySource::default().with_list(Resource::Journals, journals()));
    let (_, body) = send(&router, "GET", "/api/journals?sort=total_debit&dir=asc").await;
    let numbers: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["journal_number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["JV-004", "JV-001", "JV-003", "JV-002"]);
}

#[tokio::test]
async fn test_pagination() {
    let (router, _) = app(MemorySource::default().with_list(Resource::Products, products(40)));

    let (status, body) = send(&router, "GET", "/api/products?page=3&page_size=15").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 3);
    assert_eq!(body["total_pages"], 3);
    assert_eq!(body["items"].as_array().unwrap().len(), 10);
    assert_eq!(body["items"][0]["sku"], "SKU-031");

    // past the end clamps to the last page
    let (_, body) = send(&router, "GET", "/api/products?page=9").await;
    assert_eq!(body["page"], 3);

    let (status, body) = send(&router, "GET", "/api/products?page_size=25").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_low_stock_filter() {
    let (router, _) = app(MemorySource::default().with_list(Resource::Products, products(40)));
    let (_, body) = send(&router, "GET", "/api/products?low_stock=true").await;
    assert_eq!(body["total_count"], 5);
}

#[tokio::test]
async fn test_destructive_actions_need_confirmation() {
    let source = MemorySource::default().with_document(
        "api/gl-journals/1/",
        json!({"id": 1, "journal_number": "JV-001", "status": "draft"}),
    );
    let (router, source) = app(source);

    let (status, body) = send(&router, "DELETE", "/api/journals/1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("delete journal 1"));
    assert!(source.calls().is_empty());

    let (status, body) = send(&router, "DELETE", "/api/journals/1?confirm=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(source.calls(), vec![(Method::Delete, "api/gl-journals/1/".to_string())]);
}

#[tokio::test]
async fn test_posting_a_posted_journal_is_rejected() {
    let source = MemorySource::default().with_document(
        "api/gl-journals/2/",
        json!({"id": 2, "journal_number": "JV-002", "status": "posted"}),
    );
    let (router, source) = app(source);

    let (status, body) = send(&router, "POST", "/api/journals/2/post?confirm=true").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("cannot be posted"));
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn test_upstream_error_message_passes_through() {
    let source = MemorySource::default()
        .with_document("api/gl-journals/1/", json!({"id": 1, "journal_number": "JV-001", "status": "draft"}))
        .rejecting_sends(400, "Period 2024-01 is closed");
    let (router, _) = app(source);

    let (status, body) = send(&router, "POST", "/api/journals/1/post?confirm=true").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Period 2024-01 is closed");
    assert_eq!(body["code"], "API_ERROR");
}

#[tokio::test]
async fn test_missing_upstream_record_is_not_found() {
    let (router, _) = app(MemorySource::default());
    let (status, _) = send(&router, "POST", "/api/journals/7/cancel?confirm=true").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_refresh_serves_previous_snapshot() {
    let (router, source) = app(MemorySource::default().with_list(Resource::Products, products(3)));

    let (status, body) = send(&router, "GET", "/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].is_null());

    source.offline.store(true, Ordering::SeqCst);
    let (status, body) = send(&router, "GET", "/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 3);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_first_load_failure_is_bad_gateway() {
    let source = MemorySource::default();
    source.offline.store(true, Ordering::SeqCst);
    let (router, _) = app(source);
    let (status, body) = send(&router, "GET", "/api/stock-movements").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_account_tree_search() {
    let accounts = vec![
        json!({"id": 1, "parent_account": null, "account_code": "1000", "account_name": "Assets"}),
        json!({"id": 2, "parent_account": 1, "account_code": "1010", "account_name": "Cash"}),
        json!({"id": 3, "parent_account": 1, "account_code": "1200", "account_name": "Receivables"}),
    ];
    let (router, _) = app(MemorySource::default().with_list(Resource::Accounts, accounts));

    let (_, body) = send(&router, "GET", "/api/accounts/tree").await;
    assert_eq!(body["count"], 3);

    let (_, body) = send(&router, "GET", "/api/accounts/tree?q=cash").await;
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_movement_analytics_window() {
    let movements = vec![
        json!({"id": 1, "movement_type": "in", "quantity": 10, "date": "2024-01-01"}),
        json!({"id": 2, "movement_type": "out", "quantity": 4, "date": "2024-01-09"}),
        json!({"id": 3, "movement_type": "in", "quantity": 6, "date": "2024-01-10"}),
    ];
    let (router, _) = app(MemorySource::default().with_list(Resource::StockMovements, movements));

    let (status, body) = send(&router, "GET", "/api/stock-movements/analytics?end=2024-01-10&window_days=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_movements"], 2);
    assert_eq!(body["by_day"].as_array().unwrap().len(), 2);

    let (status, body) = send(&router, "GET", "/api/stock-movements/analytics?end=2024-01-10&window_days=200000000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_movements"], 3);
}

#[tokio::test]
async fn test_htmx_requests_get_fragments() {
    let (router, _) = app(MemorySource::default().with_list(Resource::Journals, journals()));

    let (status, full) = page(&router, "/journals", false).await;
    assert_eq!(status, StatusCode::OK);
    assert!(full.contains("<!DOCTYPE html>"));
    assert!(full.contains("JV-002"));

    let (_, fragment) = page(&router, "/journals?status=posted", true).await;
    assert!(!fragment.contains("<!DOCTYPE html>"));
    assert!(fragment.contains("JV-002"));
    assert!(!fragment.contains("JV-001"));
}

#[tokio::test]
async fn test_dashboard_reports_failed_sections() {
    let source = MemorySource::default().with_list(Resource::Journals, journals());
    source.offline.store(true, Ordering::SeqCst);
    let (router, _) = app(source);

    let (status, body) = send(&router, "GET", "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warnings"].as_array().unwrap().len(), 4);
}
