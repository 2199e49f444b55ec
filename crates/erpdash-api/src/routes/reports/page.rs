//! Report page rendering - Full page endpoints
//!
//! Failures render as a banner above the date form so the range can be
//! corrected in place.

use axum::extract::Query;
use erpdash_core::aggregate::percentage;
use erpdash_core::models::{ProfitLoss, ProfitLossLine, TrialBalance};
use erpdash_utils::{escape_html, format_percentage};

use crate::params::{date, Params};
use crate::render::{stat_card, warnings, Formatters};
use crate::{ApiResult, AppState, CONTENT_TARGET};

fn date_value(params: &Params, name: &str) -> String {
    escape_html(params.get(name).map(String::as_str).unwrap_or(""))
}

fn report_form(path: &str, inputs: &str) -> String {
    format!(
        "<form class='flex flex-wrap items-center gap-2 mb-6' hx-get='{}' hx-target='{}' hx-push-url='true'>{}\
         <button type='submit' class='px-4 py-2 bg-indigo-600 text-white rounded-lg'>Run</button></form>",
        path, CONTENT_TARGET, inputs
    )
}

fn trial_balance_html(report: &TrialBalance, fmt: &Formatters) -> String {
    let rows: String = report
        .accounts
        .iter()
        .map(|row| {
            format!(
                "<tr class='border-b'><td class='px-4 py-2 font-mono'>{}</td><td class='px-4 py-2'>{}</td><td class='px-4 py-2 text-gray-500'>{}</td><td class='px-4 py-2 text-right'>{}</td><td class='px-4 py-2 text-right'>{}</td></tr>",
                escape_html(&row.account_code),
                escape_html(&row.account_name),
                escape_html(&row.account_type),
                fmt.currency(Some(row.debit)),
                fmt.currency(Some(row.credit))
            )
        })
        .collect();
    let (debit, credit) = report.totals();
    let status = if report.is_balanced() {
        "<span class='text-green-600'>Balanced</span>".to_string()
    } else {
        format!(
            "<span class='text-red-600'>Out of balance by {}</span>",
            fmt.currency(Some((debit - credit).abs()))
        )
    };

    format!(
        r#"<div class='bg-white rounded-xl shadow-sm overflow-x-auto'>
            <table class='w-full'>
                <thead class='bg-gray-50'><tr>
                    <th class='px-4 py-2 text-left text-sm'>Code</th><th class='px-4 py-2 text-left text-sm'>Account</th><th class='px-4 py-2 text-left text-sm'>Type</th>
                    <th class='px-4 py-2 text-right text-sm'>Debit</th><th class='px-4 py-2 text-right text-sm'>Credit</th>
                </tr></thead>
                <tbody>{}</tbody>
                <tfoot class='font-semibold'><tr><td class='px-4 py-2' colspan='3'>Total ({})</td><td class='px-4 py-2 text-right'>{}</td><td class='px-4 py-2 text-right'>{}</td></tr></tfoot>
            </table>
        </div>"#,
        rows,
        status,
        fmt.currency(Some(debit)),
        fmt.currency(Some(credit))
    )
}

fn section_html(title: &str, lines: &[ProfitLossLine], total: f64, fmt: &Formatters) -> String {
    let rows: String = lines
        .iter()
        .map(|line| {
            format!(
                "<div class='flex justify-between py-1 border-b text-sm'><span>{} {}</span><span>{} <span class='text-gray-400'>{}</span></span></div>",
                escape_html(&line.account_code),
                escape_html(&line.account_name),
                fmt.currency(Some(line.amount)),
                format_percentage(Some(percentage(line.amount, total)))
            )
        })
        .collect();
    format!(
        "<div class='bg-white rounded-xl shadow-sm p-6'><h3 class='text-lg font-semibold mb-3'>{}</h3>{}\
         <div class='flex justify-between pt-2 font-semibold'><span>Total</span><span>{}</span></div></div>",
        title,
        rows,
        fmt.currency(Some(total))
    )
}

fn profit_loss_html(report: &ProfitLoss, fmt: &Formatters) -> String {
    let net = report.net();
    format!(
        r#"<div class='grid grid-cols-1 md:grid-cols-3 gap-4 mb-6'>{}{}{}</div>
        <div class='grid grid-cols-1 lg:grid-cols-2 gap-6'>{}{}</div>"#,
        stat_card("Revenue", &fmt.currency(Some(report.revenue_total())), "green"),
        stat_card("Expenses", &fmt.currency(Some(report.expense_total())), "red"),
        stat_card(if net < 0.0 { "Net loss" } else { "Net profit" }, &fmt.currency(Some(net)), "indigo"),
        section_html("Revenue", &report.revenue, report.revenue_total(), fmt),
        section_html("Expenses", &report.expenses, report.expense_total(), fmt)
    )
}

async fn load_trial_balance(state: &AppState, params: &Params) -> ApiResult<TrialBalance> {
    let as_of = date(params, "as_of_date")?;
    Ok(state.service.trial_balance(as_of).await?)
}

async fn load_profit_loss(state: &AppState, params: &Params) -> ApiResult<ProfitLoss> {
    let start = date(params, "start_date")?;
    let end = date(params, "end_date")?;
    Ok(state.service.profit_loss(start, end).await?)
}

pub async fn page_trial_balance(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    params: Query<Params>,
) -> axum::response::Html<String> {
    let path = "/reports/trial-balance";
    let body = match load_trial_balance(&state, &params).await {
        Ok(report) => trial_balance_html(&report, &state.fmt),
        Err(e) => warnings(&[e.to_string()]),
    };
    let form = report_form(
        path,
        &format!(
            "<label class='text-sm text-gray-600'>As of</label><input type='date' name='as_of_date' value='{}' class='px-3 py-2 border rounded-lg'>",
            date_value(&params, "as_of_date")
        ),
    );
    let inner_content = format!(
        "<div class='mb-6'><h2 class='text-2xl font-bold'>Trial Balance</h2></div>{}{}",
        form, body
    );
    axum::response::Html(crate::page_response(&headers, "Trial Balance", path, &inner_content))
}

pub async fn page_profit_loss(
    state: axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    params: Query<Params>,
) -> axum::response::Html<String> {
    let path = "/reports/profit-loss";
    let body = match load_profit_loss(&state, &params).await {
        Ok(report) => profit_loss_html(&report, &state.fmt),
        Err(e) => warnings(&[e.to_string()]),
    };
    let form = report_form(
        path,
        &format!(
            "<input type='date' name='start_date' value='{}' class='px-3 py-2 border rounded-lg'>\
             <span class='text-gray-500'>to</span>\
             <input type='date' name='end_date' value='{}' class='px-3 py-2 border rounded-lg'>",
            date_value(&params, "start_date"),
            date_value(&params, "end_date")
        ),
    );
    let inner_content = format!(
        "<div class='mb-6'><h2 class='text-2xl font-bold'>Profit &amp; Loss</h2></div>{}{}",
        form, body
    );
    axum::response::Html(crate::page_response(&headers, "Profit & Loss", path, &inner_content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fmt() -> Formatters {
        Formatters::from_config(&Default::default())
    }

    #[test]
    fn test_trial_balance_flags_imbalance() {
        let report: TrialBalance = serde_json::from_value(json!({
            "rows": [
                {"account_code": "1000", "account_name": "Cash", "debit": "150.00", "credit": 0},
                {"account_code": "4000", "account_name": "Sales", "debit": 0, "credit": "100.00"}
            ]
        }))
        .unwrap();
        let html = trial_balance_html(&report, &fmt());
        assert!(html.contains("Out of balance by $50.00"));
        assert!(html.contains("$150.00"));
    }

    #[test]
    fn test_profit_loss_shares() {
        let report: ProfitLoss = serde_json::from_value(json!({
            "income": [
                {"account_code": "4000", "account_name": "Sales", "amount": 300},
                {"account_code": "4100", "account_name": "Services", "amount": 100}
            ],
            "expenses": [{"account_code": "5000", "account_name": "Rent", "amount": 500}]
        }))
        .unwrap();
        let html = profit_loss_html(&report, &fmt());
        assert!(html.contains("Net loss"));
        assert!(html.contains("75.0%"));
        assert!(html.contains("100.0%"));
    }
}
