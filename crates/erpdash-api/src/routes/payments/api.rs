//! Payment advice API endpoints - JSON API

use axum::extract::{Multipart, Path, Query};
use erpdash_core::models::ReconcileRequest;
use erpdash_core::{DocumentUpload, Resource, SortDirection, TableView};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::params::{require_confirmation, table_query, Params, TableParams};
use crate::routes::{load_page, table_json};
use crate::{success, AppState};

pub const ADVICE_TABLE: TableParams = TableParams {
    search_fields: &["advice_number", "customer", "status"],
    categories: &[("status", "status")],
    date_field: Some("payment_date"),
    range: Some(("min_amount", "max_amount", "amount")),
    default_sort: Some(("payment_date", SortDirection::Descending)),
};

/// Form part carrying the advice document
pub const DOCUMENT_FIELD: &str = "document";

fn form_error(e: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest {
        message: format!("Invalid form data: {}", e),
    }
}

/// Split a multipart body into text fields and the optional document.
/// An empty file part counts as no document.
pub async fn read_advice_form(mut multipart: Multipart) -> ApiResult<(Vec<(String, String)>, Option<DocumentUpload>)> {
    let mut fields = Vec::new();
    let mut document = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == DOCUMENT_FIELD {
            let file_name = field.file_name().unwrap_or(DOCUMENT_FIELD).to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(form_error)?;
            if !bytes.is_empty() {
                document = Some(DocumentUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else if !name.is_empty() {
            let text = field.text().await.map_err(form_error)?;
            fields.push((name, text));
        }
    }

    Ok((fields, document))
}

pub async fn api_advices(
    state: axum::extract::State<AppState>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    let query = table_query(&params, &ADVICE_TABLE, &state.config)?;
    let page_state = load_page(&state.pages.payments, state.service.records(Resource::PaymentAdvices)).await?;
    let view = TableView::derive(&page_state, &query);
    Ok(axum::Json(table_json(&view, &query)))
}

pub async fn api_advice_create(
    state: axum::extract::State<AppState>,
    multipart: Multipart,
) -> ApiResult<axum::Json<Value>> {
    let (fields, document) = read_advice_form(multipart).await?;
    let data = state.service.create_payment_advice(fields, document).await?;
    Ok(success("Payment advice created", data))
}

pub async fn api_advice_update(
    state: axum::extract::State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<axum::Json<Value>> {
    let (fields, document) = read_advice_form(multipart).await?;
    let data = state.service.update_payment_advice(id, fields, document).await?;
    Ok(success("Payment advice updated", data))
}

pub async fn api_advice_delete(
    state: axum::extract::State<AppState>,
    Path(id): Path<i64>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    require_confirmation(&params, &format!("delete payment advice {}", id))?;
    state.service.delete_payment_advice(id).await?;
    log::info!("Deleted payment advice {}", id);
    Ok(success("Payment advice deleted", Value::Null))
}

pub async fn api_reconcile(
    state: axum::extract::State<AppState>,
    axum::Json(request): axum::Json<ReconcileRequest>,
) -> ApiResult<axum::Json<Value>> {
    let data = state.service.reconcile(&request).await?;
    log::info!(
        "Reconciled {} invoice numbers for {}",
        request.normalized().invoice_numbers.len(),
        request.customer
    );
    Ok(success("Reconciliation complete", data))
}
