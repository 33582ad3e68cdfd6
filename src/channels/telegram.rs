//! Telegram 渠道
//!
//! Bot API 长轮询接入：getUpdates 拉事件，标准化后丢给分发器；
//! 投递端把 Render 翻成 sendMessage / sendPhoto / editMessageText。
//! 全部消息按 HTML 发送；按钮回调产生的响应优先原地编辑，编辑不了
//! （图片卡片、消息过旧）就删掉重发。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::TelegramSection;
use crate::gateway::{
    Button, ButtonAction, ChannelEvent, ChannelKind, Dispatcher, EventMeta, EventPayload, Render,
    RenderSink, SessionKey,
};

/// 单条消息长度上限（Bot API 限 4096，留余量）
const MAX_MESSAGE_CHARS: usize = 4000;

/// getUpdates 失败后的退避
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Telegram 渠道适配器
pub struct TelegramChannel {
    client: reqwest::Client,
    /// `{api_base}/bot{token}`
    base: String,
    poll_timeout_secs: u64,
}

impl TelegramChannel {
    pub fn new(token: &str, cfg: &TelegramSection) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.poll_timeout_secs + 10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base: format!("{}/bot{}", cfg.api_base.trim_end_matches('/'), token),
            poll_timeout_secs: cfg.poll_timeout_secs,
        }
    }

    /// Token 只认 TELEGRAM_BOT_TOKEN 环境变量
    pub fn from_env(cfg: &TelegramSection) -> anyhow::Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow::anyhow!("TELEGRAM_BOT_TOKEN not set"))?;
        if token.trim().is_empty() {
            anyhow::bail!("TELEGRAM_BOT_TOKEN is empty");
        }
        Ok(Self::new(token.trim(), cfg))
    }

    /// 长轮询主循环：正常情况下不返回
    pub async fn run(&self, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
        let me = self.call("getMe", json!({})).await?;
        let username = me
            .pointer("/result/username")
            .and_then(|v| v.as_str())
            .unwrap_or("?");
        tracing::info!(bot = username, "telegram polling started");

        let mut offset: i64 = 0;
        loop {
            let body = json!({
                "offset": offset,
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            });
            let updates = match self.fetch_updates(body).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed, backing off");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };
            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Some(event) = normalize(update) {
                    dispatcher.dispatch(event).await;
                }
            }
        }
    }

    async fn fetch_updates(&self, body: serde_json::Value) -> anyhow::Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.base);
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("getUpdates http {}", status);
        }
        let parsed: UpdatesResponse = resp.json().await?;
        if !parsed.ok {
            anyhow::bail!("getUpdates returned ok=false");
        }
        Ok(parsed.result.unwrap_or_default())
    }

    /// 调用 Bot API 方法，ok=false 视为错误
    async fn call(&self, method: &str, body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let url = format!("{}/{}", self.base, method);
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        let value: serde_json::Value = resp.json().await?;
        let ok = value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
        if !status.is_success() || !ok {
            let desc = value
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            anyhow::bail!("telegram {} failed ({}): {}", method, status, desc);
        }
        Ok(value)
    }

    async fn send_render(
        &self,
        chat_id: &str,
        meta: &EventMeta,
        render: &Render,
    ) -> anyhow::Result<()> {
        let keyboard = keyboard_json(&render.buttons);
        let editable = meta
            .message_ref
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok());

        if let Some(image) = &render.image {
            // 图片卡片没法原地编辑，旧消息删掉重发
            if let Some(id) = editable {
                let _ = self
                    .call(
                        "deleteMessage",
                        json!({"chat_id": chat_id, "message_id": id}),
                    )
                    .await;
            }
            let mut body = json!({
                "chat_id": chat_id,
                "photo": image,
                "caption": render.text,
                "parse_mode": "HTML",
            });
            if let Some(kb) = &keyboard {
                body["reply_markup"] = kb.clone();
            }
            match self.call("sendPhoto", body).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    // 图片地址失效也要把文字发出去
                    tracing::warn!(error = %e, "sendPhoto failed, sending text only");
                    return self.send_text(chat_id, &render.text, keyboard.as_ref()).await;
                }
            }
        }

        if let Some(id) = editable {
            let mut body = json!({
                "chat_id": chat_id,
                "message_id": id,
                "text": render.text,
                "parse_mode": "HTML",
            });
            if let Some(kb) = &keyboard {
                body["reply_markup"] = kb.clone();
            }
            if self.call("editMessageText", body).await.is_ok() {
                return Ok(());
            }
            // 原消息编辑不了（图片消息 / 内容未变），删掉重发
            let _ = self
                .call(
                    "deleteMessage",
                    json!({"chat_id": chat_id, "message_id": id}),
                )
                .await;
        }

        self.send_text(chat_id, &render.text, keyboard.as_ref()).await
    }

    /// 超长文本按字符分段，按钮只挂在最后一段
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&serde_json::Value>,
    ) -> anyhow::Result<()> {
        let chunks = split_chunks(text, MAX_MESSAGE_CHARS);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = json!({
                "chat_id": chat_id,
                "text": chunk,
                "parse_mode": "HTML",
            });
            if i == last {
                if let Some(kb) = keyboard {
                    body["reply_markup"] = kb.clone();
                }
            }
            self.call("sendMessage", body).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RenderSink for TelegramChannel {
    async fn deliver(&self, key: &SessionKey, meta: &EventMeta, render: Render) {
        if let Some(ack) = &meta.ack_ref {
            if let Err(e) = self
                .call("answerCallbackQuery", json!({"callback_query_id": ack}))
                .await
            {
                tracing::debug!(error = %e, "answerCallbackQuery failed");
            }
        }
        if let Err(e) = self.send_render(&key.user_id, meta, &render).await {
            tracing::error!(session = %key, error = %e, "telegram delivery failed");
        }
    }
}

/// Render 按钮行 → inline_keyboard
fn keyboard_json(buttons: &[Vec<Button>]) -> Option<serde_json::Value> {
    if buttons.is_empty() {
        return None;
    }
    let rows: Vec<Vec<serde_json::Value>> = buttons
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| match &b.action {
                    ButtonAction::Callback(data) => {
                        json!({"text": b.label, "callback_data": data})
                    }
                    ButtonAction::Url(url) => json!({"text": b.label, "url": url}),
                })
                .collect()
        })
        .collect();
    Some(json!({ "inline_keyboard": rows }))
}

fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }
    text.chars()
        .collect::<Vec<_>>()
        .chunks(max_chars)
        .map(|c| c.iter().collect())
        .collect()
}

/// 一条 update → 标准化事件。文本消息不可编辑，message_ref 留空；
/// 按钮回调带上原消息 id 与应答句柄。
fn normalize(update: Update) -> Option<ChannelEvent> {
    if let Some(msg) = update.message {
        let text = msg.text?;
        return Some(ChannelEvent {
            key: SessionKey::new(ChannelKind::Telegram, msg.chat.id.to_string()),
            payload: EventPayload::Text(text),
            meta: EventMeta {
                message_ref: None,
                ack_ref: None,
                display_name: msg.from.and_then(|u| u.first_name),
            },
        });
    }
    if let Some(cb) = update.callback_query {
        let data = cb.data?;
        let message = cb.message?;
        return Some(ChannelEvent {
            key: SessionKey::new(ChannelKind::Telegram, message.chat.id.to_string()),
            payload: EventPayload::Callback(data),
            meta: EventMeta {
                message_ref: Some(message.message_id.to_string()),
                ack_ref: Some(cb.id),
                display_name: cb.from.first_name,
            },
        });
    }
    None
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    result: Option<Vec<Update>>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<IncomingMessage>,
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    message_id: i64,
    from: Option<User>,
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    #[allow(dead_code)]
    id: i64,
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    message: Option<IncomingMessage>,
    data: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_message() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 10,
            "message": {
                "message_id": 77,
                "from": {"id": 5, "first_name": "Aziz"},
                "chat": {"id": 5},
                "text": "salom"
            }
        }))
        .unwrap();

        let event = normalize(update).unwrap();
        assert_eq!(event.key.user_id, "5");
        assert!(matches!(event.payload, EventPayload::Text(ref t) if t == "salom"));
        // 文本消息不能原地编辑
        assert!(event.meta.message_ref.is_none());
        assert_eq!(event.meta.display_name.as_deref(), Some("Aziz"));
    }

    #[test]
    fn test_normalize_callback() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 11,
            "callback_query": {
                "id": "cbq1",
                "from": {"id": 5, "first_name": "Aziz"},
                "message": {"message_id": 42, "chat": {"id": 5}},
                "data": "category:3"
            }
        }))
        .unwrap();

        let event = normalize(update).unwrap();
        assert!(matches!(event.payload, EventPayload::Callback(ref d) if d == "category:3"));
        assert_eq!(event.meta.message_ref.as_deref(), Some("42"));
        assert_eq!(event.meta.ack_ref.as_deref(), Some("cbq1"));
    }

    #[test]
    fn test_normalize_skips_stickers() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 12,
            "message": {
                "message_id": 78,
                "chat": {"id": 5}
            }
        }))
        .unwrap();
        assert!(normalize(update).is_none());
    }

    #[test]
    fn test_keyboard_json_shapes_rows() {
        let kb = keyboard_json(&[
            vec![
                Button::cb("🔍 Qidirish", "search"),
                Button::cb("📂 Kategoriyalar", "categories"),
            ],
            vec![Button::url("🛒 Sayt", "https://shop.test")],
        ])
        .unwrap();

        let rows = kb["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1]["callback_data"], "categories");
        assert_eq!(rows[1][0]["url"], "https://shop.test");
        assert!(rows[1][0].get("callback_data").is_none());

        assert!(keyboard_json(&[]).is_none());
    }

    #[test]
    fn test_split_chunks_by_chars() {
        let short = split_chunks("salom", 4000);
        assert_eq!(short, vec!["salom".to_string()]);

        let long: String = "ў".repeat(9000);
        let chunks = split_chunks(&long, 4000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 4000);
        assert_eq!(chunks[2].chars().count(), 1000);
    }
}
