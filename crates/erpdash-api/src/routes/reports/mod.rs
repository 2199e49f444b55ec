//! Report routes - Financial statements fetched from the ERP
//!
//! Features:
//! - Trial balance as of a date
//! - Profit & loss over a date range

pub mod api;
pub mod page;

pub use api::{api_profit_loss, api_trial_balance};
pub use page::{page_profit_loss, page_trial_balance};
