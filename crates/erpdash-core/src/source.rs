//! The upstream boundary
//!
//! [`ErpSource`] is everything the core needs from the ERP REST API. The
//! HTTP implementation lives in `erpdash-client`; tests use in-memory fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreResult;
use crate::record::Record;

/// Collections the dashboard lists and mutates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Accounts,
    Journals,
    StockMovements,
    Products,
    PaymentAdvices,
}

impl Resource {
    /// Collection path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Accounts => "api/chart-of-accounts/",
            Resource::Journals => "api/gl-journals/",
            Resource::StockMovements => "api/stock-movements/",
            Resource::Products => "api/products/",
            Resource::PaymentAdvices => "api/payment-advices/",
        }
    }

    /// Path of one item
    pub fn item_path(&self, id: i64) -> String {
        format!("{}{}/", self.path(), id)
    }

    /// Path of a custom action on one item, e.g. `post_journal`
    pub fn action_path(&self, id: i64, action: &str) -> String {
        format!("{}{}/{}/", self.path(), id, action)
    }

    /// Path of a collection-level action, e.g. `stock_transfer`
    pub fn collection_action_path(&self, action: &str) -> String {
        format!("{}{}/", self.path(), action)
    }

    /// Name used in logs and error messages
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Accounts => "accounts",
            Resource::Journals => "journals",
            Resource::StockMovements => "stock movements",
            Resource::Products => "products",
            Resource::PaymentAdvices => "payment advices",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File attached to a multipart request
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Access to the ERP REST API
#[async_trait]
pub trait ErpSource: Send + Sync {
    /// Every record of a collection. Paginated listings are followed to the end.
    async fn list(&self, resource: Resource, query: &[(String, String)]) -> CoreResult<Vec<Record>>;

    /// GET a single JSON document
    async fn fetch(&self, path: &str, query: &[(String, String)]) -> CoreResult<Value>;

    /// Send a JSON body (or none) and return the response body, `Value::Null` when empty
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> CoreResult<Value>;

    /// Send a multipart form with an optional `document` file part
    async fn upload(
        &self,
        method: Method,
        path: &str,
        fields: Vec<(String, String)>,
        document: Option<DocumentUpload>,
    ) -> CoreResult<Value>;
}
