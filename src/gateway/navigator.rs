//! 类目树导航
//!
//! 在会话的类目路径上做状态机：进入类目重建真实祖先链，返回上一级弹栈。
//! 每次返回前都对照目录校验路径；上游删了类目就截断到最近存活祖先，
//! 并把 stale 标记交给路由层做一次性提示，绝不静默失败。

use std::sync::Arc;

use crate::catalog::{Category, CatalogError, CatalogStore, Product};
use crate::gateway::error::{GatewayError, Missing};

/// 路径深度上限，同时防住脏数据里的父子环
const MAX_DEPTH: usize = 5;

/// 某一层展示的内容：子类目列表，或叶子类目的商品
#[derive(Debug, Clone)]
pub enum NavView {
    Children {
        /// None 表示根层
        category: Option<Category>,
        children: Vec<Category>,
    },
    Products {
        category: Category,
        products: Vec<Product>,
    },
}

/// 一次导航操作的结果
#[derive(Debug, Clone)]
pub struct NavOutcome {
    pub view: NavView,
    /// 路径被截断过，响应里要带一次提示
    pub stale: bool,
}

/// 导航器：只读目录 + 可变借入的路径
#[derive(Clone)]
pub struct Navigator {
    catalog: Arc<dyn CatalogStore>,
}

impl Navigator {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// 根类目列表
    pub async fn root(&self) -> Result<NavView, GatewayError> {
        self.level_view(&[]).await
    }

    /// 进入类目：路径重建为该类目的真实祖先链（点旧消息上的按钮也能落到正确层级）
    pub async fn select(&self, path: &mut Vec<i64>, id: i64) -> Result<NavOutcome, GatewayError> {
        let ancestry = self.ancestry_ids(id).await?;
        if ancestry.is_empty() {
            return Err(GatewayError::NotFound(Missing::Category(id)));
        }
        *path = ancestry;
        let view = self.level_view(path).await?;
        Ok(NavOutcome { view, stale: false })
    }

    /// 返回上一级。路径已失效时截断本身就是「向上走」，不再额外弹栈；
    /// 根层的返回是幂等的，重新渲染根列表。
    pub async fn back(&self, path: &mut Vec<i64>) -> Result<NavOutcome, GatewayError> {
        let stale = self.verify_path(path).await?;
        if !stale {
            path.pop();
        }
        let view = self.level_view(path).await?;
        Ok(NavOutcome { view, stale })
    }

    /// 校验路径：从根往下找到第一个已消失的类目就截断。返回是否发生截断。
    pub async fn verify_path(&self, path: &mut Vec<i64>) -> Result<bool, CatalogError> {
        for i in 0..path.len() {
            if self.catalog.fetch_category(path[i]).await?.is_none() {
                path.truncate(i);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 路径对应的类目标题（AI 上下文用；中途消失的层直接跳过）
    pub async fn breadcrumb_titles(&self, path: &[i64]) -> Result<Vec<String>, CatalogError> {
        let mut titles = Vec::with_capacity(path.len());
        for &id in path {
            if let Some(cat) = self.catalog.fetch_category(id).await? {
                titles.push(cat.title);
            }
        }
        Ok(titles)
    }

    /// 商品卡片上的类目面包屑：从所属类目向上走，`A > B` 形式，查不到给「Boshqa」
    pub async fn category_breadcrumbs(
        &self,
        category_id: Option<i64>,
    ) -> Result<String, CatalogError> {
        let Some(start) = category_id else {
            return Ok("Boshqa".to_string());
        };
        let mut titles = Vec::new();
        let mut current = Some(start);
        for _ in 0..MAX_DEPTH {
            let Some(id) = current else { break };
            match self.catalog.fetch_category(id).await? {
                Some(cat) => {
                    titles.push(cat.title);
                    current = cat.parent;
                }
                None => break,
            }
        }
        if titles.is_empty() {
            return Ok("Boshqa".to_string());
        }
        titles.reverse();
        Ok(titles.join(" > "))
    }

    async fn ancestry_ids(&self, id: i64) -> Result<Vec<i64>, CatalogError> {
        let mut ids = Vec::new();
        let mut current = Some(id);
        for _ in 0..MAX_DEPTH {
            let Some(cid) = current else { break };
            match self.catalog.fetch_category(cid).await? {
                Some(cat) => {
                    ids.push(cid);
                    current = cat.parent;
                }
                None => break,
            }
        }
        ids.reverse();
        Ok(ids)
    }

    /// 当前层内容：有子类目列子类目，叶子类目列商品
    async fn level_view(&self, path: &[i64]) -> Result<NavView, GatewayError> {
        let Some(&id) = path.last() else {
            let children = self.catalog.category_children(None).await?;
            return Ok(NavView::Children {
                category: None,
                children,
            });
        };

        let category = self
            .catalog
            .fetch_category(id)
            .await?
            .ok_or(GatewayError::NotFound(Missing::Category(id)))?;
        let children = self.catalog.category_children(Some(id)).await?;
        if children.is_empty() {
            let products = self.catalog.products_in_category(id).await?;
            Ok(NavView::Products { category, products })
        } else {
            Ok(NavView::Children {
                category: Some(category),
                children,
            })
        }
    }
}
