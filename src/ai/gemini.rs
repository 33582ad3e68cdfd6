//! Google Gemini 客户端
//!
//! 直连 generativelanguage REST API（v1beta generateContent），密钥走 URL 参数。
//! 历史轮次映射为 user / model 角色，系统提示词走 system_instruction。

use async_trait::async_trait;
use serde::Deserialize;

use crate::ai::{AiContext, AiError, AiOracle};

/// 默认模型：延迟低、免费配额充足，适合客服兜底场景
pub const GEMINI_FLASH_LITE: &str = "gemini-2.0-flash-lite";

/// 官方 API 入口
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini 客户端：持有 reqwest Client、模型名与密钥
pub struct GeminiOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiOracle {
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.unwrap_or(GEMINI_BASE_URL).trim_end_matches('/').to_string(),
        }
    }

    fn build_body(system: &str, question: &str, ctx: &AiContext) -> serde_json::Value {
        let mut contents = Vec::new();
        for turn in &ctx.turns {
            contents.push(serde_json::json!({
                "role": "user",
                "parts": [{ "text": turn.question }]
            }));
            contents.push(serde_json::json!({
                "role": "model",
                "parts": [{ "text": turn.answer }]
            }));
        }
        contents.push(serde_json::json!({
            "role": "user",
            "parts": [{ "text": question }]
        }));

        serde_json::json!({
            "system_instruction": { "parts": [{ "text": system }] },
            "contents": contents
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl AiOracle for GeminiOracle {
    async fn ask(&self, system: &str, question: &str, ctx: &AiContext) -> Result<String, AiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = Self::build_body(system, question, ctx);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout
                } else {
                    AiError::Provider(e.to_string())
                }
            })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            let snippet: String = detail.chars().take(200).collect();
            return Err(AiError::Provider(format!("gemini http {}: {}", status, snippet)));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AiError::Provider(format!("gemini decode: {}", e)))?;

        let text = parsed
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AiError::Empty);
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// 创建 Gemini 客户端（默认模型 + 官方入口）
pub fn create_gemini_oracle(api_key: &str, model: Option<&str>, base_url: Option<&str>) -> GeminiOracle {
    GeminiOracle::new(api_key, model.unwrap_or(GEMINI_FLASH_LITE), base_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ChatTurn;

    #[test]
    fn test_build_body_maps_turns_to_roles() {
        let ctx = AiContext {
            turns: vec![ChatTurn {
                question: "salom".to_string(),
                answer: "Assalomu alaykum!".to_string(),
            }],
            ..Default::default()
        };
        let body = GeminiOracle::build_body("SYS", "narxi qancha?", &ctx);

        assert_eq!(body["system_instruction"]["parts"][0]["text"], "SYS");
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "narxi qancha?");
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let oracle = GeminiOracle::new("k", GEMINI_FLASH_LITE, Some("https://proxy.test/"));
        assert_eq!(oracle.base_url, "https://proxy.test");
    }
}
