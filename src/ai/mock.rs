//! Mock AI 客户端（测试与无密钥本地运行用）
//!
//! 回显用户问题为固定乌兹别克语话术，便于不配置任何 API 跑通完整对话链路。

use async_trait::async_trait;

use crate::ai::{AiContext, AiError, AiOracle};

/// Mock 客户端：固定话术回显问题
#[derive(Debug, Default)]
pub struct MockOracle;

#[async_trait]
impl AiOracle for MockOracle {
    async fn ask(
        &self,
        _system: &str,
        question: &str,
        _ctx: &AiContext,
    ) -> Result<String, AiError> {
        Ok(format!(
            "Sinov rejimi: \"{}\" savolingiz qabul qilindi. Operatorlarimiz tez orada javob berishadi.",
            question
        ))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_echoes_question() {
        let oracle = MockOracle;
        let answer = oracle
            .ask("system", "yetkazib berish qancha?", &AiContext::default())
            .await
            .unwrap();
        assert!(answer.contains("yetkazib berish qancha?"));
    }
}
