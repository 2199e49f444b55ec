//! Typed schemas for upstream records and outgoing requests
//!
//! Upstream amounts arrive either as JSON numbers or as decimal strings
//! (`"100.00"`); both decode to `f64`. Dates accept a plain `YYYY-MM-DD`
//! or a timestamp.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// Amounts closer than this are equal
pub const AMOUNT_EPSILON: f64 = 0.005;

fn amount_from_value(value: Value) -> Result<f64, String> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("invalid amount {}", n)),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid amount \"{}\"", s)),
        other => Err(format!("expected an amount, got {}", other)),
    }
}

/// Deserialize an amount from a number, a decimal string or null (zero)
pub fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    amount_from_value(value).map_err(serde::de::Error::custom)
}

/// Like [`amount`] but keeps null and absent values as `None`
pub fn optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => amount_from_value(value).map(Some).map_err(serde::de::Error::custom),
    }
}

/// Lenient date: unparseable or missing dates decode as `None`
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(erpdash_utils::parse_date(&s)),
        _ => Ok(None),
    }
}

fn default_true() -> bool {
    true
}

fn require(condition: bool, message: &str) -> CoreResult<()> {
    if condition {
        Ok(())
    } else {
        Err(CoreError::Validation {
            message: message.to_string(),
        })
    }
}

// ==================== Chart of accounts ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub account_code: String,
    #[serde(alias = "name")]
    pub account_name: String,
    #[serde(default)]
    pub account_type: String,
    #[serde(default)]
    pub parent_account: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "amount")]
    pub balance: f64,
}

/// Payload for creating an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub account_code: String,
    pub account_name: String,
    pub account_type: String,
    #[serde(default)]
    pub parent_account: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewAccount {
    pub fn validate(&self) -> CoreResult<()> {
        require(!self.account_code.trim().is_empty(), "Account code is required")?;
        require(!self.account_name.trim().is_empty(), "Account name is required")?;
        require(!self.account_type.trim().is_empty(), "Account type is required")
    }
}

// ==================== GL journals ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalStatus {
    #[serde(alias = "DRAFT")]
    Draft,
    #[serde(alias = "POSTED")]
    Posted,
    #[serde(alias = "CANCELLED")]
    Cancelled,
}

impl JournalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalStatus::Draft => "draft",
            JournalStatus::Posted => "posted",
            JournalStatus::Cancelled => "cancelled",
        }
    }

    /// Drafts can be edited, deleted and posted
    pub fn is_editable(&self) -> bool {
        matches!(self, JournalStatus::Draft)
    }

    pub fn can_post(&self) -> bool {
        matches!(self, JournalStatus::Draft)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, JournalStatus::Posted)
    }
}

impl std::fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JournalStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(JournalStatus::Draft),
            "posted" => Ok(JournalStatus::Posted),
            "cancelled" => Ok(JournalStatus::Cancelled),
            _ => Err(format!("Invalid journal status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub account: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "amount")]
    pub debit: f64,
    #[serde(default, deserialize_with = "amount")]
    pub credit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlJournal {
    pub id: i64,
    #[serde(default)]
    pub journal_number: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub status: JournalStatus,
    #[serde(default, deserialize_with = "amount")]
    pub total_debit: f64,
    #[serde(default, deserialize_with = "amount")]
    pub total_credit: f64,
    #[serde(default)]
    pub lines: Vec<JournalLine>,
}

impl GlJournal {
    pub fn is_balanced(&self) -> bool {
        (self.total_debit - self.total_credit).abs() < AMOUNT_EPSILON
    }
}

/// Payload for creating or updating a journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJournal {
    pub date: NaiveDate,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub lines: Vec<JournalLine>,
}

impl NewJournal {
    pub fn total_debit(&self) -> f64 {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credit(&self) -> f64 {
        self.lines.iter().map(|l| l.credit).sum()
    }

    /// A journal needs two or more one-sided lines whose debits equal credits
    pub fn validate(&self) -> CoreResult<()> {
        require(!self.description.trim().is_empty(), "Description is required")?;
        require(self.lines.len() >= 2, "A journal needs at least two lines")?;
        for (i, line) in self.lines.iter().enumerate() {
            if line.debit < 0.0 || line.credit < 0.0 {
                return Err(CoreError::Validation {
                    message: format!("Line {}: amounts cannot be negative", i + 1),
                });
            }
            if (line.debit > 0.0) == (line.credit > 0.0) {
                return Err(CoreError::Validation {
                    message: format!("Line {}: enter either a debit or a credit", i + 1),
                });
            }
        }
        let (debit, credit) = (self.total_debit(), self.total_credit());
        if (debit - credit).abs() >= AMOUNT_EPSILON {
            return Err(CoreError::Validation {
                message: format!(
                    "Journal is not balanced: debits {:.2} != credits {:.2}",
                    debit, credit
                ),
            });
        }
        Ok(())
    }
}

// ==================== Reports ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    #[serde(default)]
    pub account_code: String,
    #[serde(default, alias = "name")]
    pub account_name: String,
    #[serde(default)]
    pub account_type: String,
    #[serde(default, deserialize_with = "amount")]
    pub debit: f64,
    #[serde(default, deserialize_with = "amount")]
    pub credit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    #[serde(default)]
    pub as_of_date: Option<String>,
    #[serde(default, alias = "rows")]
    pub accounts: Vec<TrialBalanceRow>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub total_debit: Option<f64>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub total_credit: Option<f64>,
}

impl TrialBalance {
    /// Upstream totals, or the row sums when upstream omits them
    pub fn totals(&self) -> (f64, f64) {
        let debit = self
            .total_debit
            .unwrap_or_else(|| self.accounts.iter().map(|r| r.debit).sum());
        let credit = self
            .total_credit
            .unwrap_or_else(|| self.accounts.iter().map(|r| r.credit).sum());
        (debit, credit)
    }

    pub fn is_balanced(&self) -> bool {
        let (debit, credit) = self.totals();
        (debit - credit).abs() < AMOUNT_EPSILON
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitLossLine {
    #[serde(default)]
    pub account_code: String,
    #[serde(default, alias = "name")]
    pub account_name: String,
    #[serde(default, deserialize_with = "amount")]
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitLoss {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default, alias = "income")]
    pub revenue: Vec<ProfitLossLine>,
    #[serde(default)]
    pub expenses: Vec<ProfitLossLine>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub total_revenue: Option<f64>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub total_expenses: Option<f64>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub net_profit: Option<f64>,
}

impl ProfitLoss {
    pub fn revenue_total(&self) -> f64 {
        self.total_revenue
            .unwrap_or_else(|| self.revenue.iter().map(|l| l.amount).sum())
    }

    pub fn expense_total(&self) -> f64 {
        self.total_expenses
            .unwrap_or_else(|| self.expenses.iter().map(|l| l.amount).sum())
    }

    pub fn net(&self) -> f64 {
        self.net_profit
            .unwrap_or_else(|| self.revenue_total() - self.expense_total())
    }
}

// ==================== Inventory ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    #[serde(alias = "IN", alias = "inbound", alias = "receipt")]
    In,
    #[serde(alias = "OUT", alias = "outbound", alias = "issue")]
    Out,
    #[serde(alias = "TRANSFER")]
    Transfer,
    #[serde(alias = "ADJUSTMENT")]
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::Transfer => "transfer",
            MovementType::Adjustment => "adjustment",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: i64,
    #[serde(default)]
    pub product: Option<i64>,
    #[serde(default)]
    pub product_name: Option<String>,
    pub movement_type: MovementType,
    #[serde(deserialize_with = "amount")]
    pub quantity: f64,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default, alias = "created_at", deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
}

impl StockMovement {
    /// Quantity signed by direction: receipts add, issues remove, transfers
    /// and adjustments keep the sign upstream gave them
    pub fn signed_quantity(&self) -> f64 {
        match self.movement_type {
            MovementType::In => self.quantity.abs(),
            MovementType::Out => -self.quantity.abs(),
            MovementType::Transfer | MovementType::Adjustment => self.quantity,
        }
    }
}

/// Payload for creating or replacing a stock movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementInput {
    pub product: i64,
    pub movement_type: MovementType,
    pub quantity: f64,
    pub warehouse: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl MovementInput {
    pub fn validate(&self) -> CoreResult<()> {
        require(self.quantity.is_finite(), "Quantity must be a number")?;
        match self.movement_type {
            MovementType::Adjustment => require(self.quantity != 0.0, "Quantity cannot be zero")?,
            _ => require(self.quantity > 0.0, "Quantity must be positive")?,
        }
        require(!self.warehouse.trim().is_empty(), "Warehouse is required")
    }
}

/// Warehouse-to-warehouse transfer request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransfer {
    pub product: i64,
    pub from_warehouse: String,
    pub to_warehouse: String,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl StockTransfer {
    pub fn validate(&self) -> CoreResult<()> {
        require(!self.from_warehouse.trim().is_empty(), "Source warehouse is required")?;
        require(!self.to_warehouse.trim().is_empty(), "Destination warehouse is required")?;
        require(
            self.from_warehouse.trim() != self.to_warehouse.trim(),
            "Source and destination warehouses must differ",
        )?;
        require(
            self.quantity.is_finite() && self.quantity > 0.0,
            "Quantity must be positive",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    #[serde(default)]
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "price", deserialize_with = "amount")]
    pub unit_price: f64,
    #[serde(default, alias = "stock_quantity", deserialize_with = "amount")]
    pub quantity_on_hand: f64,
    #[serde(default, deserialize_with = "amount")]
    pub reorder_level: f64,
}

impl Product {
    /// At or below the reorder level
    pub fn is_low_stock(&self) -> bool {
        self.quantity_on_hand <= self.reorder_level
    }

    pub fn stock_value(&self) -> f64 {
        self.quantity_on_hand * self.unit_price
    }
}

/// Payload for creating or replacing a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub sku: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub unit_price: f64,
    #[serde(default)]
    pub reorder_level: f64,
}

impl ProductInput {
    pub fn validate(&self) -> CoreResult<()> {
        require(!self.sku.trim().is_empty(), "SKU is required")?;
        require(!self.name.trim().is_empty(), "Name is required")?;
        require(
            self.unit_price.is_finite() && self.unit_price >= 0.0,
            "Unit price cannot be negative",
        )?;
        require(
            self.reorder_level.is_finite() && self.reorder_level >= 0.0,
            "Reorder level cannot be negative",
        )
    }
}

// ==================== Payments ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAdvice {
    pub id: i64,
    #[serde(default)]
    pub advice_number: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default, deserialize_with = "amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient_date")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub invoice_numbers: Vec<String>,
    /// URL of the uploaded document, if any
    #[serde(default)]
    pub document: Option<String>,
}

/// Invoice-number reconciliation request for one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub customer: String,
    pub invoice_numbers: Vec<String>,
}

impl ReconcileRequest {
    /// Trimmed, deduplicated invoice numbers in input order
    pub fn normalized(&self) -> ReconcileRequest {
        let mut seen = std::collections::HashSet::new();
        let invoice_numbers = self
            .invoice_numbers
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty() && seen.insert(n.clone()))
            .collect();
        ReconcileRequest {
            customer: self.customer.trim().to_string(),
            invoice_numbers,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        require(!self.customer.trim().is_empty(), "Customer is required")?;
        require(
            self.invoice_numbers.iter().any(|n| !n.trim().is_empty()),
            "Enter at least one invoice number",
        )
    }
}
