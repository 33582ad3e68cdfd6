//! AI 模块
//!
//! 目录查询之外的自由问答后端：Gemini（默认）、OpenAI 兼容端点、Mock。
//! create_fallback_adapter 按配置装配客户端并套上超时 / 重试 / 截断边界。

pub mod fallback;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use fallback::{build_system_prompt, FallbackAdapter, FALLBACK_REPLY};
pub use gemini::{create_gemini_oracle, GeminiOracle, GEMINI_BASE_URL, GEMINI_FLASH_LITE};
pub use mock::MockOracle;
pub use openai::OpenAiOracle;
pub use traits::{AiContext, AiError, AiOracle, ChatTurn};

use crate::config::AiSection;

/// 按配置创建问答客户端。密钥只从环境变量读取，缺失时回落 Mock 并告警。
pub fn create_oracle(cfg: &AiSection) -> Arc<dyn AiOracle> {
    match cfg.provider.as_str() {
        "gemini" => match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                tracing::info!(model = %cfg.model, "using gemini oracle");
                Arc::new(GeminiOracle::new(&key, &cfg.model, cfg.base_url.as_deref()))
            }
            _ => {
                tracing::warn!("GEMINI_API_KEY not set, falling back to mock oracle");
                Arc::new(MockOracle)
            }
        },
        "openai" => match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                tracing::info!(model = %cfg.model, "using openai oracle");
                Arc::new(OpenAiOracle::new(&key, &cfg.model, cfg.base_url.as_deref()))
            }
            _ => {
                tracing::warn!("OPENAI_API_KEY not set, falling back to mock oracle");
                Arc::new(MockOracle)
            }
        },
        "mock" => Arc::new(MockOracle),
        other => {
            tracing::warn!(provider = other, "unknown ai provider, falling back to mock oracle");
            Arc::new(MockOracle)
        }
    }
}

/// 按配置装配带边界保护的兜底适配器
pub fn create_fallback_adapter(cfg: &AiSection) -> FallbackAdapter {
    FallbackAdapter::from_config(create_oracle(cfg), cfg)
}
