//! Payment advice routes
//!
//! Features:
//! - Derived table with search, status filter, payment date and amount ranges
//! - Multipart create/update with an optional `document` file
//! - Invoice-number reconciliation

pub mod api;
pub mod page;

pub use api::{
    api_advice_create, api_advice_delete, api_advice_update, api_advices, api_reconcile,
    ADVICE_TABLE,
};
pub use page::page_advices;
