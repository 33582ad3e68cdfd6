//! 目录层：外部电商数据库的只读访问、分页与数据模型

#[cfg(feature = "mysql")]
pub mod mysql;
pub mod page;
pub mod store;
pub mod types;

#[cfg(feature = "mysql")]
pub use mysql::MySqlCatalog;

pub use page::{paginate, Page};
pub use store::{
    create_catalog, CatalogError, CatalogStore, MemoryCatalog, RetryingCatalog,
    DEFAULT_SEARCH_CAP, PHONE_ORDERS_CAP,
};
pub use types::{
    format_price, status_emoji, status_label, stock_status, Category, Order, OrderItem, Product,
};
