//! 检索解析
//!
//! 两级策略：先查结构化目录，查不到（或一眼就不像商品查询）再走 AI 兜底，
//! 让回答尽量落在真实库存上，AI 成本只花在结构化检索帮不上的场合。
//! 目录宕机时不落 AI：目录都连不上还让 AI 报价，报出来的只能是编的。

use std::sync::Arc;

use crate::ai::{AiContext, FallbackAdapter};
use crate::catalog::{CatalogStore, Product};
use crate::config::ShopSection;
use crate::gateway::error::GatewayError;

/// 超过这个词数就当成自然语句交给 AI
const MAX_QUERY_TOKENS: usize = 4;

/// 寒暄 / 客套词：带这些的文本不是商品查询
const CHAT_WORDS: &[&str] = &[
    "salom",
    "assalomu",
    "alaykum",
    "rahmat",
    "qalay",
    "qalaysiz",
    "xayr",
    "iltimos",
    "hello",
    "привет",
    "спасибо",
];

/// AI 兜底提示里最多带几个相关商品
const HINT_CAP: usize = 5;

/// 解析结果
#[derive(Debug, Clone)]
pub enum Resolution {
    /// 结构化检索命中
    Products { query: String, products: Vec<Product> },
    /// AI 回答
    Answer(String),
}

/// 检索解析器
pub struct Resolver {
    catalog: Arc<dyn CatalogStore>,
    ai: FallbackAdapter,
    shop: ShopSection,
}

impl Resolver {
    pub fn new(catalog: Arc<dyn CatalogStore>, ai: FallbackAdapter, shop: ShopSection) -> Self {
        Self { catalog, ai, shop }
    }

    /// 自由文本入口：按形状分流
    pub async fn resolve(&self, text: &str, ctx: &AiContext) -> Result<Resolution, GatewayError> {
        if looks_like_catalog_query(text) {
            return self.search_then_ai(text, ctx).await;
        }
        self.ask_ai(text, ctx.clone()).await
    }

    /// 待搜索模式入口：跳过形状判断，直接查目录
    pub async fn forced_search(
        &self,
        query: &str,
        ctx: &AiContext,
    ) -> Result<Resolution, GatewayError> {
        self.search_then_ai(query, ctx).await
    }

    async fn search_then_ai(&self, query: &str, ctx: &AiContext) -> Result<Resolution, GatewayError> {
        let hits = self.catalog.search_products(query).await?;
        if !hits.is_empty() {
            tracing::debug!(query, hits = hits.len(), "structured search hit");
            return Ok(Resolution::Products {
                query: query.to_string(),
                products: hits,
            });
        }

        tracing::debug!(query, "structured search empty, delegating to ai");
        let mut ctx = ctx.clone();
        ctx.catalog_hint = self.related_hint(query).await;
        self.ask_ai(query, ctx).await
    }

    async fn ask_ai(&self, question: &str, ctx: AiContext) -> Result<Resolution, GatewayError> {
        // 类目清单拿不到就发个空的,不因此放弃回答
        let categories: Vec<String> = self
            .catalog
            .category_children(None)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.title)
            .collect();
        let system = crate::ai::build_system_prompt(&self.shop, &categories);
        let answer = self.ai.answer(&system, question, &ctx).await?;
        Ok(Resolution::Answer(answer))
    }

    /// 逐词松弛检索，给 AI 凑「相关商品」素材；纯属锦上添花，出错就不带
    async fn related_hint(&self, query: &str) -> Option<String> {
        let mut seen = Vec::new();
        for token in query.split_whitespace() {
            if token.chars().count() < 3 {
                continue;
            }
            let Ok(found) = self.catalog.search_products(token).await else {
                break;
            };
            for p in found {
                if seen.iter().all(|s: &Product| s.id != p.id) {
                    seen.push(p);
                    if seen.len() >= HINT_CAP {
                        break;
                    }
                }
            }
            if seen.len() >= HINT_CAP {
                break;
            }
        }
        if seen.is_empty() {
            return None;
        }
        let lines: Vec<String> = seen
            .iter()
            .map(|p| {
                format!(
                    "- ID: {} | {} | {} so'm | {}",
                    p.id,
                    p.title,
                    crate::catalog::format_price(p.price),
                    crate::catalog::stock_status(p.stock)
                )
            })
            .collect();
        Some(lines.join("\n"))
    }
}

/// 商品查询的形状判断：短、不是问句、不带寒暄词。
/// 阈值是工程取舍：检索本身按「每个词都是标题子串」匹配，误判成查询的
/// 自然短语几乎必然检索落空，依旧会落到 AI，代价只是一次目录查询。
pub fn looks_like_catalog_query(text: &str) -> bool {
    let t = text.trim();
    if t.is_empty() || t.ends_with('?') {
        return false;
    }
    if t.split_whitespace().count() > MAX_QUERY_TOKENS {
        return false;
    }
    let lower = t.to_lowercase();
    !CHAT_WORDS
        .iter()
        .any(|w| lower.split_whitespace().any(|tok| tok == *w))
}
