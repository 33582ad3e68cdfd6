//! MySQL 目录后端
//!
//! 对接外部商城 CMS 的数据库（mg_product / mg_category / mg_order 表结构，
//! 前缀可配）。所有查询只读；DECIMAL 列在 SQL 里 CAST 成 DOUBLE，
//! INT 列 CAST 成 SIGNED，避免驱动侧的精度类型转换。

#![cfg(feature = "mysql")]

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;

use super::store::{CatalogError, CatalogStore, PHONE_ORDERS_CAP};
use super::types::{Category, Order, OrderItem, Product};

/// 外部商城数据库上的只读目录
pub struct MySqlCatalog {
    pool: MySqlPool,
    /// 表前缀，默认 "mg_"
    prefix: String,
    search_cap: usize,
}

impl MySqlCatalog {
    pub async fn connect(url: &str, prefix: &str, search_cap: usize) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self {
            pool,
            prefix: prefix.to_string(),
            search_cap: search_cap.max(1),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn product_columns() -> &'static str {
        "CAST(p.id AS SIGNED) AS id, \
         p.title, \
         CAST(p.price AS DOUBLE) AS price, \
         CAST(p.old_price AS DOUBLE) AS old_price, \
         p.image_url, \
         COALESCE(NULLIF(p.short_description, ''), p.description) AS description, \
         p.url, \
         CAST(p.activity AS SIGNED) AS activity, \
         CAST(p.cat_id AS SIGNED) AS category_id, \
         CAST(p.count AS SIGNED) AS stock"
    }
}

fn row_to_product(row: &MySqlRow) -> Product {
    let image: Option<String> = row.get("image_url");
    let category_id: Option<i64> = row.get("category_id");
    Product {
        id: row.get("id"),
        title: row.get("title"),
        price: row.get::<Option<f64>, _>("price").unwrap_or(0.0),
        old_price: row.get("old_price"),
        image: image.filter(|s| !s.is_empty()),
        description: row.get::<Option<String>, _>("description").unwrap_or_default(),
        slug: row.get::<Option<String>, _>("url").unwrap_or_default(),
        active: row.get::<i64, _>("activity") != 0,
        // CMS 用 cat_id = 0 表示未分类
        category_id: category_id.filter(|id| *id != 0),
        stock: row.get::<Option<i64>, _>("stock").unwrap_or(0),
    }
}

fn row_to_order(row: &MySqlRow) -> Order {
    let created_ts: Option<i64> = row.get("created_ts");
    Order {
        id: row.get("id"),
        name: row.get::<Option<String>, _>("name").unwrap_or_default(),
        phone: row.get::<Option<String>, _>("phone").unwrap_or_default(),
        address: row.get::<Option<String>, _>("address").unwrap_or_default(),
        status: row.get::<Option<i64>, _>("status").unwrap_or(0),
        total: row.get::<Option<f64>, _>("total").unwrap_or(0.0),
        created_at: created_ts
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.naive_utc()),
    }
}

fn db_err(e: sqlx::Error) -> CatalogError {
    CatalogError::Connection(e.to_string())
}

#[async_trait]
impl CatalogStore for MySqlCatalog {
    async fn search_products(&self, text: &str) -> Result<Vec<Product>, CatalogError> {
        let tokens: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let mut sql = format!(
            "SELECT {} FROM {} p WHERE p.activity = 1",
            Self::product_columns(),
            self.table("product"),
        );
        for _ in &tokens {
            sql.push_str(" AND p.title LIKE ?");
        }
        sql.push_str(" ORDER BY p.sort ASC, p.id DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        for token in &tokens {
            query = query.bind(format!("%{}%", token));
        }
        let rows = query
            .bind(self.search_cap as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(row_to_product).collect())
    }

    async fn category_children(&self, parent: Option<i64>) -> Result<Vec<Category>, CatalogError> {
        // CMS 里根分类的 parent 为 0
        let sql = format!(
            "SELECT CAST(id AS SIGNED) AS id, title, CAST(parent AS SIGNED) AS parent, url \
             FROM {} WHERE invisible = 0 AND parent = ? ORDER BY sort ASC, title ASC",
            self.table("category"),
        );
        let rows = sqlx::query(&sql)
            .bind(parent.unwrap_or(0))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows
            .iter()
            .map(|row| {
                let parent_raw: i64 = row.get("parent");
                Category {
                    id: row.get("id"),
                    title: row.get("title"),
                    parent: (parent_raw != 0).then_some(parent_raw),
                    slug: row.get::<Option<String>, _>("url").unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn products_in_category(&self, category_id: i64) -> Result<Vec<Product>, CatalogError> {
        let sql = format!(
            "SELECT {} FROM {} p WHERE p.activity = 1 AND p.cat_id = ? \
             ORDER BY p.sort ASC, p.id DESC LIMIT ?",
            Self::product_columns(),
            self.table("product"),
        );
        let rows = sqlx::query(&sql)
            .bind(category_id)
            .bind(self.search_cap as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(row_to_product).collect())
    }

    async fn fetch_category(&self, id: i64) -> Result<Option<Category>, CatalogError> {
        let sql = format!(
            "SELECT CAST(id AS SIGNED) AS id, title, CAST(parent AS SIGNED) AS parent, url \
             FROM {} WHERE invisible = 0 AND id = ?",
            self.table("category"),
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|row| {
            let parent_raw: i64 = row.get("parent");
            Category {
                id: row.get("id"),
                title: row.get("title"),
                parent: (parent_raw != 0).then_some(parent_raw),
                slug: row.get::<Option<String>, _>("url").unwrap_or_default(),
            }
        }))
    }

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        let sql = format!(
            "SELECT {} FROM {} p WHERE p.id = ? AND p.activity = 1",
            Self::product_columns(),
            self.table("product"),
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_product))
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, CatalogError> {
        let sql = format!(
            "SELECT CAST(id AS SIGNED) AS id, name_buyer AS name, phone, address, \
             CAST(status_id AS SIGNED) AS status, CAST(summ AS DOUBLE) AS total, \
             CAST(UNIX_TIMESTAMP(add_date) AS SIGNED) AS created_ts \
             FROM {} WHERE id = ?",
            self.table("order"),
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_order))
    }

    async fn orders_by_phone(&self, phone: &str) -> Result<Vec<Order>, CatalogError> {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT CAST(id AS SIGNED) AS id, name_buyer AS name, phone, address, \
             CAST(status_id AS SIGNED) AS status, CAST(summ AS DOUBLE) AS total, \
             CAST(UNIX_TIMESTAMP(add_date) AS SIGNED) AS created_ts \
             FROM {} \
             WHERE REPLACE(REPLACE(REPLACE(phone, ' ', ''), '-', ''), '+', '') LIKE ? \
             ORDER BY id DESC LIMIT ?",
            self.table("order"),
        );
        let rows = sqlx::query(&sql)
            .bind(format!("%{}%", digits))
            .bind(PHONE_ORDERS_CAP as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.iter().map(row_to_order).collect())
    }

    async fn order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, CatalogError> {
        let sql = format!(
            "SELECT oc.name AS title, CAST(oc.count AS SIGNED) AS quantity, \
             CAST(oc.price AS DOUBLE) AS price \
             FROM {} oc WHERE oc.order_id = ?",
            self.table("order_content"),
        );
        let rows = sqlx::query(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows
            .iter()
            .map(|row| OrderItem {
                title: row.get::<Option<String>, _>("title").unwrap_or_default(),
                quantity: row.get::<Option<i64>, _>("quantity").unwrap_or(0),
                price: row.get::<Option<f64>, _>("price").unwrap_or(0.0),
            })
            .collect())
    }
}
