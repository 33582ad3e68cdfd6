//! 目录数据模型
//!
//! 商品 / 分类 / 订单均来自外部电商数据库，本 crate 只读不写。
//! 订单状态表与价格格式与源商城保持一致（乌兹别克语文案）。

use serde::{Deserialize, Serialize};

/// 商品记录（外部商城所有，本核心视为不可变）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    /// 现价（苏姆）
    pub price: f64,
    /// 折扣前原价，高于现价时渲染为删除线
    pub old_price: Option<f64>,
    /// 图片文件名（完整 URL 由渲染层按商城目录结构拼出）
    pub image: Option<String>,
    pub description: String,
    /// 商城站内链接的 slug
    pub slug: String,
    pub active: bool,
    /// 所属分类，用于详情卡的面包屑
    pub category_id: Option<i64>,
    /// 库存量；-1 表示不限量
    pub stock: i64,
}

impl Product {
    /// 是否处于折扣状态（原价高于现价才算）
    pub fn has_discount(&self) -> bool {
        self.old_price.map(|old| old > self.price).unwrap_or(false)
    }
}

/// 分类节点；parent 为 None 即根分类
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub parent: Option<i64>,
    pub slug: String,
}

/// 订单头（只读；明细见 OrderItem）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub status: i64,
    pub total: f64,
    pub created_at: Option<chrono::NaiveDateTime>,
}

/// 订单明细行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub title: String,
    pub quantity: i64,
    pub price: f64,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// 订单状态参照表：ID -> 乌兹别克语标签；未知 ID 退化为 "Holat #N"
pub fn status_label(status_id: i64) -> String {
    match status_id {
        0 => "Yangi buyurtma".to_string(),
        1 => "Qabul qilindi".to_string(),
        2 => "Jarayonda".to_string(),
        3 => "Yuborildi".to_string(),
        4 => "Yetkazildi".to_string(),
        5 => "Bekor qilindi".to_string(),
        other => format!("Holat #{}", other),
    }
}

/// 状态对应的 emoji（与标签同表维护）
pub fn status_emoji(status_id: i64) -> &'static str {
    match status_id {
        0 => "🆕",
        1 => "✅",
        2 => "⏳",
        3 => "🚚",
        4 => "✅",
        5 => "❌",
        _ => "📦",
    }
}

/// 库存状态文案：-1 不限量按有货处理，1..=10 提示少量
pub fn stock_status(stock: i64) -> &'static str {
    match stock {
        -1 => "✅ Mavjud",
        0 => "❌ Tugagan",
        1..=10 => "⚠️ Kam qoldi",
        _ => "✅ Mavjud",
    }
}

/// 价格格式化：取整并按千位插空格，如 1234567 -> "1 234 567"
pub fn format_price(price: f64) -> String {
    let whole = price.trunc() as i64;
    let negative = whole < 0;
    let digits = whole.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price_groups_thousands() {
        assert_eq!(format_price(1234567.0), "1 234 567");
        assert_eq!(format_price(999.0), "999");
        assert_eq!(format_price(1000.0), "1 000");
        assert_eq!(format_price(0.0), "0");
    }

    #[test]
    fn test_format_price_drops_fraction() {
        assert_eq!(format_price(2500.75), "2 500");
    }

    #[test]
    fn test_status_label_known_and_fallback() {
        assert_eq!(status_label(0), "Yangi buyurtma");
        assert_eq!(status_label(4), "Yetkazildi");
        assert_eq!(status_label(42), "Holat #42");
    }

    #[test]
    fn test_stock_status_boundaries() {
        assert_eq!(stock_status(-1), "✅ Mavjud");
        assert_eq!(stock_status(0), "❌ Tugagan");
        assert_eq!(stock_status(1), "⚠️ Kam qoldi");
        assert_eq!(stock_status(10), "⚠️ Kam qoldi");
        assert_eq!(stock_status(11), "✅ Mavjud");
    }

    #[test]
    fn test_discount_requires_higher_old_price() {
        let mut p = Product {
            id: 1,
            title: "Televizor".to_string(),
            price: 100.0,
            old_price: Some(150.0),
            image: None,
            description: String::new(),
            slug: "televizor".to_string(),
            active: true,
            category_id: None,
            stock: 3,
        };
        assert!(p.has_discount());
        p.old_price = Some(90.0);
        assert!(!p.has_discount());
        p.old_price = None;
        assert!(!p.has_discount());
    }

    #[test]
    fn test_order_item_subtotal() {
        let item = OrderItem {
            title: "Kabel".to_string(),
            quantity: 3,
            price: 15000.0,
        };
        assert_eq!(item.subtotal(), 45000.0);
    }
}
