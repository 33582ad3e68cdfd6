//! AI 问答抽象
//!
//! 目录回答不了的自由文本交给 AI 兜底。所有后端（Gemini / OpenAI 兼容 / Mock）
//! 实现 AiOracle：ask 一次性带全上下文，实现方不保存任何会话状态。

use async_trait::async_trait;

/// 一轮完整对话（用户提问 + AI 回答），随上下文下发
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// 每次提问携带的快照上下文
#[derive(Debug, Clone, Default)]
pub struct AiContext {
    /// 用户当前所在类目路径（面包屑标题，最外层在前）
    pub category_path: Vec<String>,
    /// 最近几轮对话
    pub turns: Vec<ChatTurn>,
    /// 结构化检索命中的商品摘要，作为回答素材
    pub catalog_hint: Option<String>,
}

/// AI 调用错误。RateLimited 可退避重试，其余直接走兜底话术。
#[derive(Debug, Clone, thiserror::Error)]
pub enum AiError {
    /// 服务端 / 网络错误（非限流）
    #[error("ai provider error: {0}")]
    Provider(String),
    /// 限流（429 / ResourceExhausted）
    #[error("ai provider rate limited")]
    RateLimited,
    /// 请求超时
    #[error("ai request timed out")]
    Timeout,
    /// 返回了空回答
    #[error("ai returned empty answer")]
    Empty,
}

/// 问答客户端 trait：实现必须无状态、可跨会话并发复用
#[async_trait]
pub trait AiOracle: Send + Sync {
    /// 发起一次问答，system 为完整系统提示词，ctx 为该用户的会话快照
    async fn ask(&self, system: &str, question: &str, ctx: &AiContext) -> Result<String, AiError>;

    /// 后端名称（日志用）
    fn name(&self) -> &'static str;
}
