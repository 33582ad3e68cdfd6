//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url），
//! 作为 Gemini 之外的备选后端；累计 token 用量便于成本核对。

use std::sync::atomic::{AtomicU64, Ordering};

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::ai::{AiContext, AiError, AiOracle};

/// OpenAI 兼容客户端：持有 Client 与 model 名，ask 时拼装消息并取首条 content
pub struct OpenAiOracle {
    client: Client<OpenAIConfig>,
    model: String,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl OpenAiOracle {
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
        }
    }

    /// 累计 token 用量：(prompt, completion)
    pub fn token_usage(&self) -> (u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
        )
    }

    fn build_messages(
        system: &str,
        question: &str,
        ctx: &AiContext,
    ) -> Vec<ChatCompletionRequestMessage> {
        let mut messages = Vec::with_capacity(ctx.turns.len() * 2 + 2);
        messages.push(ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .unwrap(),
        ));
        for turn in &ctx.turns {
            messages.push(ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.question.clone())
                    .build()
                    .unwrap(),
            ));
            messages.push(ChatCompletionRequestMessage::Assistant(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.answer.clone())
                    .build()
                    .unwrap(),
            ));
        }
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(question.to_string())
                .build()
                .unwrap(),
        ));
        messages
    }

    fn classify(err: String) -> AiError {
        let lower = err.to_lowercase();
        if lower.contains("429") || lower.contains("rate limit") {
            AiError::RateLimited
        } else if lower.contains("timed out") || lower.contains("timeout") {
            AiError::Timeout
        } else {
            AiError::Provider(err)
        }
    }
}

#[async_trait]
impl AiOracle for OpenAiOracle {
    async fn ask(&self, system: &str, question: &str, ctx: &AiContext) -> Result<String, AiError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::build_messages(system, question, ctx))
            .build()
            .map_err(|e| AiError::Provider(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| Self::classify(e.to_string()))?;

        if let Some(usage) = &response.usage {
            self.prompt_tokens
                .fetch_add(usage.prompt_tokens as u64, Ordering::Relaxed);
            self.completion_tokens
                .fetch_add(usage.completion_tokens as u64, Ordering::Relaxed);
        }

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(AiError::Empty);
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
