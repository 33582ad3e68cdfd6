//! 目录数据访问抽象层
//!
//! 定义统一的只读查询接口，支持内存与 MySQL 两种实现。
//! 查无数据返回 None/空集，不走错误通道；错误只描述基础设施故障。
//! RetryingCatalog 统一套上单次查询超时与有限次重试。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::types::{Category, Order, OrderItem, Product};

/// 搜索/分类列表返回的最大条数（再多由「商城里查看」兜底）
pub const DEFAULT_SEARCH_CAP: usize = 50;

/// 按电话号码查订单时最多返回的条数
pub const PHONE_ORDERS_CAP: usize = 5;

/// 重试间隔（毫秒）
const RETRY_DELAY_MS: u64 = 100;

/// 目录层错误：连接失败与查询超时；两者都属于「目录暂不可用」
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error("catalog connection failed: {0}")]
    Connection(String),
    #[error("catalog query timed out")]
    Timeout,
}

/// 目录只读查询接口
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// 按标题搜索在售商品：查询按空白切词，每个词都必须是标题的子串（忽略大小写）
    async fn search_products(&self, text: &str) -> Result<Vec<Product>, CatalogError>;

    /// 取可见子分类；parent 为 None 即根分类列表
    async fn category_children(&self, parent: Option<i64>) -> Result<Vec<Category>, CatalogError>;

    /// 取某分类下的在售商品
    async fn products_in_category(&self, category_id: i64) -> Result<Vec<Product>, CatalogError>;

    async fn fetch_category(&self, id: i64) -> Result<Option<Category>, CatalogError>;

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, CatalogError>;

    /// 按电话号码查最近订单（只比较数字位，新订单在前）
    async fn orders_by_phone(&self, phone: &str) -> Result<Vec<Order>, CatalogError>;

    async fn order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, CatalogError>;
}

/// 给任意目录后端套上超时与有限次重试
///
/// 目录查询要求短超时（亚秒级），慢查询按 Timeout 处理并重试；
/// 重试次数用尽后把最后一个错误交给上层渲染「目录暂不可用」。
pub struct RetryingCatalog {
    inner: Arc<dyn CatalogStore>,
    timeout: Duration,
    retries: u32,
}

impl RetryingCatalog {
    pub fn new(inner: Arc<dyn CatalogStore>, timeout: Duration, retries: u32) -> Self {
        Self {
            inner,
            timeout,
            retries,
        }
    }

    async fn run<T, F, Fut>(&self, op: &str, f: F) -> Result<T, CatalogError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CatalogError>>,
    {
        let mut last = CatalogError::Timeout;
        for attempt in 0..=self.retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
            }
            match tokio::time::timeout(self.timeout, f()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    tracing::warn!("catalog {} failed (attempt {}): {}", op, attempt + 1, e);
                    last = e;
                }
                Err(_) => {
                    tracing::warn!("catalog {} timed out (attempt {})", op, attempt + 1);
                    last = CatalogError::Timeout;
                }
            }
        }
        Err(last)
    }
}

#[async_trait]
impl CatalogStore for RetryingCatalog {
    async fn search_products(&self, text: &str) -> Result<Vec<Product>, CatalogError> {
        self.run("search_products", || self.inner.search_products(text))
            .await
    }

    async fn category_children(&self, parent: Option<i64>) -> Result<Vec<Category>, CatalogError> {
        self.run("category_children", || self.inner.category_children(parent))
            .await
    }

    async fn products_in_category(&self, category_id: i64) -> Result<Vec<Product>, CatalogError> {
        self.run("products_in_category", || {
            self.inner.products_in_category(category_id)
        })
        .await
    }

    async fn fetch_category(&self, id: i64) -> Result<Option<Category>, CatalogError> {
        self.run("fetch_category", || self.inner.fetch_category(id))
            .await
    }

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        self.run("fetch_product", || self.inner.fetch_product(id))
            .await
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, CatalogError> {
        self.run("fetch_order", || self.inner.fetch_order(id)).await
    }

    async fn orders_by_phone(&self, phone: &str) -> Result<Vec<Order>, CatalogError> {
        self.run("orders_by_phone", || self.inner.orders_by_phone(phone))
            .await
    }

    async fn order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, CatalogError> {
        self.run("order_items", || self.inner.order_items(order_id))
            .await
    }
}

/// 内存目录（测试、演示与未配置数据库时的默认后端）
///
/// 表内容可在运行中增删（测试会删分类模拟上游变更）；
/// 商品/分类按插入顺序展示，对应 MySQL 端的 sort 排序。
pub struct MemoryCatalog {
    data: RwLock<MemoryData>,
    search_cap: usize,
}

#[derive(Default)]
struct MemoryData {
    products: Vec<Product>,
    categories: Vec<Category>,
    orders: Vec<Order>,
    order_items: HashMap<i64, Vec<OrderItem>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(MemoryData::default()),
            search_cap: DEFAULT_SEARCH_CAP,
        }
    }

    pub fn with_search_cap(mut self, cap: usize) -> Self {
        self.search_cap = cap.max(1);
        self
    }

    pub fn insert_category(&self, category: Category) {
        self.data.write().unwrap().categories.push(category);
    }

    pub fn insert_product(&self, product: Product) {
        self.data.write().unwrap().products.push(product);
    }

    pub fn insert_order(&self, order: Order, items: Vec<OrderItem>) {
        let mut data = self.data.write().unwrap();
        data.order_items.insert(order.id, items);
        data.orders.push(order);
    }

    /// 模拟上游删除分类（过期路径测试用）
    pub fn remove_category(&self, id: i64) {
        self.data.write().unwrap().categories.retain(|c| c.id != id);
    }

    /// 带少量演示数据的目录，让无数据库环境也能跑通全流程
    pub fn with_demo_data() -> Self {
        let catalog = Self::new();
        for (id, title, parent, slug) in [
            (1, "Elektronika", None, "elektronika"),
            (2, "Telefonlar", Some(1), "telefonlar"),
            (3, "Televizorlar", Some(1), "televizorlar"),
            (4, "Maishiy texnika", None, "maishiy-texnika"),
        ] {
            catalog.insert_category(Category {
                id,
                title: title.to_string(),
                parent,
                slug: slug.to_string(),
            });
        }
        for (id, title, price, old, cat, stock) in [
            (101, "Samsung Galaxy A15", 2_150_000.0, None, 2, 12),
            (102, "Samsung TV 43\" UHD", 4_800_000.0, Some(5_200_000.0), 3, 4),
            (103, "Artel TV 32\"", 2_300_000.0, None, 3, -1),
            (104, "Artel muzlatgich ART-340", 5_900_000.0, None, 4, 2),
        ] {
            catalog.insert_product(Product {
                id,
                title: title.to_string(),
                price,
                old_price: old,
                image: None,
                description: String::new(),
                slug: format!("demo-{}", id),
                active: true,
                category_id: Some(cat),
                stock,
            });
        }
        catalog
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn search_products(&self, text: &str) -> Result<Vec<Product>, CatalogError> {
        let tokens: Vec<String> = text
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let data = self.data.read().unwrap();
        Ok(data
            .products
            .iter()
            .filter(|p| p.active)
            .filter(|p| {
                let title = p.title.to_lowercase();
                tokens.iter().all(|t| title.contains(t.as_str()))
            })
            .take(self.search_cap)
            .cloned()
            .collect())
    }

    async fn category_children(&self, parent: Option<i64>) -> Result<Vec<Category>, CatalogError> {
        let data = self.data.read().unwrap();
        Ok(data
            .categories
            .iter()
            .filter(|c| c.parent == parent)
            .cloned()
            .collect())
    }

    async fn products_in_category(&self, category_id: i64) -> Result<Vec<Product>, CatalogError> {
        let data = self.data.read().unwrap();
        Ok(data
            .products
            .iter()
            .filter(|p| p.active && p.category_id == Some(category_id))
            .take(self.search_cap)
            .cloned()
            .collect())
    }

    async fn fetch_category(&self, id: i64) -> Result<Option<Category>, CatalogError> {
        let data = self.data.read().unwrap();
        Ok(data.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        let data = self.data.read().unwrap();
        Ok(data.products.iter().find(|p| p.id == id).cloned())
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, CatalogError> {
        let data = self.data.read().unwrap();
        Ok(data.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn orders_by_phone(&self, phone: &str) -> Result<Vec<Order>, CatalogError> {
        let needle = digits_only(phone);
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let data = self.data.read().unwrap();
        let mut found: Vec<Order> = data
            .orders
            .iter()
            .filter(|o| digits_only(&o.phone).contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.id.cmp(&a.id));
        found.truncate(PHONE_ORDERS_CAP);
        Ok(found)
    }

    async fn order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, CatalogError> {
        let data = self.data.read().unwrap();
        Ok(data.order_items.get(&order_id).cloned().unwrap_or_default())
    }
}

/// 创建目录后端并套上重试层
///
/// backend = "mysql" 且启用 mysql feature 时连外部数据库（连接串取自配置或
/// DATABASE_URL），失败回落到内存演示目录；其余情况直接用内存目录。
pub async fn create_catalog(cfg: &crate::config::CatalogSection) -> Arc<dyn CatalogStore> {
    let backend = build_backend(cfg).await;
    Arc::new(RetryingCatalog::new(
        backend,
        Duration::from_millis(cfg.query_timeout_ms),
        cfg.max_retries,
    ))
}

async fn build_backend(cfg: &crate::config::CatalogSection) -> Arc<dyn CatalogStore> {
    #[cfg(feature = "mysql")]
    if cfg.backend == "mysql" {
        let url = cfg
            .url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok());
        match url {
            Some(url) => {
                match super::mysql::MySqlCatalog::connect(&url, &cfg.table_prefix, cfg.search_limit)
                    .await
                {
                    Ok(store) => {
                        tracing::info!("Using MySQL catalog");
                        return Arc::new(store);
                    }
                    Err(e) => {
                        tracing::warn!("MySQL catalog unavailable ({}), using demo catalog", e);
                    }
                }
            }
            None => {
                tracing::warn!("MySQL backend selected but no url / DATABASE_URL set");
            }
        }
    }

    #[cfg(not(feature = "mysql"))]
    if cfg.backend == "mysql" {
        tracing::warn!("MySQL backend requested but mysql feature not enabled, using demo catalog");
    }

    tracing::info!("Using in-memory demo catalog");
    Arc::new(MemoryCatalog::with_demo_data().with_search_cap(cfg.search_limit))
}
