//! Product routes - Product catalogue
//!
//! Features:
//! - Derived table with search, category, price range and low-stock filter
//! - Inventory summary (stock value by category)
//! - Create, update and delete products

pub mod api;
pub mod page;

pub use api::{
    api_product_create, api_product_delete, api_product_summary, api_product_update,
    api_products, low_stock_only, PRODUCT_TABLE,
};
pub use page::page_products;
