//! Stock movement routes
//!
//! Features:
//! - Derived table with search, type and warehouse filters, date range
//! - Windowed analytics: daily in/out/net buckets and type breakdown
//! - Create, update, delete movements and warehouse transfers

pub mod api;
pub mod page;

pub use api::{
    api_movement_analytics, api_movement_create, api_movement_delete, api_movement_update,
    api_movements, api_stock_transfer, MOVEMENT_TABLE,
};
pub use page::page_movements;
