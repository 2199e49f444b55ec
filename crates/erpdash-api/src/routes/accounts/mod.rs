//! Account routes - Chart of accounts
//!
//! Features:
//! - Derived table with search, type filter, balance range and sorting
//! - Tree view built from `parent_account` links, pruned by search
//! - Account creation

pub mod api;
pub mod page;

pub use api::{api_account_create, api_account_tree, api_accounts, ACCOUNT_TABLE};
pub use page::page_accounts;
