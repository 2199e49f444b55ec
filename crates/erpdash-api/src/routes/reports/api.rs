//! Report API endpoints - JSON API

use axum::extract::Query;
use serde_json::Value;

use crate::error::ApiResult;
use crate::params::{date, Params};
use crate::AppState;

/// Trial balance with the totals resolved and a balance check
pub async fn api_trial_balance(
    state: axum::extract::State<AppState>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    let as_of = date(&params, "as_of_date")?;
    let report = state.service.trial_balance(as_of).await?;
    let (debit, credit) = report.totals();
    Ok(axum::Json(serde_json::json!({
        "report": report,
        "total_debit": debit,
        "total_credit": credit,
        "balanced": report.is_balanced(),
    })))
}

pub async fn api_profit_loss(
    state: axum::extract::State<AppState>,
    params: Query<Params>,
) -> ApiResult<axum::Json<Value>> {
    let start = date(&params, "start_date")?;
    let end = date(&params, "end_date")?;
    let report = state.service.profit_loss(start, end).await?;
    Ok(axum::Json(serde_json::json!({
        "total_revenue": report.revenue_total(),
        "total_expenses": report.expense_total(),
        "net_profit": report.net(),
        "report": report,
    })))
}
