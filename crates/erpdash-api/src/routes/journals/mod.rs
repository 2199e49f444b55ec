//! Journal routes - GL journals
//!
//! Features:
//! - Derived table with search, status filter, date and amount ranges
//! - Create and edit balanced journals
//! - draft -> posted -> cancelled lifecycle with confirmation

pub mod api;
pub mod page;

pub use api::{
    api_journal_cancel, api_journal_create, api_journal_delete, api_journal_post,
    api_journal_update, api_journals, JOURNAL_TABLE,
};
pub use page::page_journals;
