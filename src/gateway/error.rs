//! 网关错误分层
//!
//! 只有三类进错误通道：指名实体未命中、目录数据源故障、AI 故障。
//! 「查到了但为空」走正常返回；旧路径截断走 NavOutcome 的 stale 标记。
//! 所有错误最终都在路由层转成用户可读话术，绝不把内部细节漏给用户。

use std::fmt;

use crate::ai::AiError;
use crate::catalog::CatalogError;

/// 被指名查询而未命中的实体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Product(i64),
    Category(i64),
    Order(i64),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Product(id) => write!(f, "product #{}", id),
            Missing::Category(id) => write!(f, "category #{}", id),
            Missing::Order(id) => write!(f, "order #{}", id),
        }
    }
}

/// 网关处理错误
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 用户指名的实体不存在（可由用户自行纠正）
    #[error("{0} not found")]
    NotFound(Missing),
    /// 目录数据源暂不可用（重试已在目录层做完）
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// AI 后端失败（路由层降级为固定话术）
    #[error(transparent)]
    Ai(#[from] AiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keeps_ids_readable() {
        let e = GatewayError::NotFound(Missing::Order(77));
        assert_eq!(e.to_string(), "order #77 not found");
    }

    #[test]
    fn test_catalog_error_converts() {
        let e: GatewayError = CatalogError::Timeout.into();
        assert!(matches!(e, GatewayError::Catalog(CatalogError::Timeout)));
    }
}
