//! Instagram 渠道
//!
//! Meta Graph API 接入：Webhook 收私信与评论（axum），Send API 回消息。
//! Meta 要求 Webhook 快速返回 200，这里只做标准化入队，处理全在 lane 里。
//! Instagram 没有 HTML 与按钮行：富文本退化为纯文本，回调按钮退化为
//! quick reply，链接按钮直接附在正文后面。帖子评论走 private reply
//! 私信回复，之后的对话回到普通私信链路。

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::config::InstagramSection;
use crate::gateway::{
    Button, ButtonAction, ChannelEvent, ChannelKind, Dispatcher, EventMeta, EventPayload, Render,
    RenderSink, SessionKey,
};

/// quick reply 上限（Send API 限制）
const MAX_QUICK_REPLIES: usize = 13;

/// quick reply 标题长度上限（字符）
const QUICK_REPLY_TITLE_CHARS: usize = 20;

/// Instagram 渠道适配器
pub struct InstagramChannel {
    client: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl InstagramChannel {
    pub fn new(access_token: &str, cfg: &InstagramSection) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// 访问令牌只认 IG_ACCESS_TOKEN 环境变量
    pub fn from_env(cfg: &InstagramSection) -> anyhow::Result<Self> {
        let token = std::env::var("IG_ACCESS_TOKEN")
            .map_err(|_| anyhow::anyhow!("IG_ACCESS_TOKEN not set"))?;
        if token.trim().is_empty() {
            anyhow::bail!("IG_ACCESS_TOKEN is empty");
        }
        Ok(Self::new(token.trim(), cfg))
    }

    async fn send(&self, body: serde_json::Value) -> anyhow::Result<()> {
        let url = format!("{}/me/messages", self.api_base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("instagram send failed: {}", text);
        }
        Ok(())
    }

    async fn send_render(
        &self,
        user_id: &str,
        meta: &EventMeta,
        render: &Render,
    ) -> anyhow::Result<()> {
        // 评论事件带评论 id，用 private reply 开启私信会话。
        // 一条评论只允许一次 private reply，所以图片不单发，全部并进一条。
        let comment_reply = meta.ack_ref.as_deref();
        let recipient = match comment_reply {
            Some(comment_id) => json!({"comment_id": comment_id}),
            None => json!({"id": user_id}),
        };

        // 图片单独一条（Send API 不支持图文同发）
        if comment_reply.is_none() {
            if let Some(image) = &render.image {
                let body = json!({
                    "recipient": {"id": user_id},
                    "message": {"attachment": {"type": "image", "payload": {"url": image}}},
                });
                if let Err(e) = self.send(body).await {
                    tracing::warn!(error = %e, "instagram image send failed, continuing with text");
                }
            }
        }

        let mut text = strip_html(&render.text);
        for url in url_lines(&render.buttons) {
            text.push('\n');
            text.push_str(&url);
        }

        let mut message = json!({ "text": text });
        let quick = quick_replies(&render.buttons);
        if !quick.is_empty() {
            message["quick_replies"] = json!(quick);
        }
        self.send(json!({
            "recipient": recipient,
            "message": message,
        }))
        .await
    }
}

#[async_trait]
impl RenderSink for InstagramChannel {
    async fn deliver(&self, key: &SessionKey, meta: &EventMeta, render: Render) {
        if let Err(e) = self.send_render(&key.user_id, meta, &render).await {
            tracing::error!(session = %key, error = %e, "instagram delivery failed");
        }
    }
}

/// Webhook 服务状态
pub struct IgState {
    pub dispatcher: Arc<Dispatcher>,
    pub verify_token: String,
}

impl IgState {
    /// 校验令牌只认 IG_VERIFY_TOKEN 环境变量
    pub fn from_env(dispatcher: Arc<Dispatcher>) -> anyhow::Result<Self> {
        let verify_token = std::env::var("IG_VERIFY_TOKEN")
            .map_err(|_| anyhow::anyhow!("IG_VERIFY_TOKEN not set"))?;
        Ok(Self {
            dispatcher,
            verify_token,
        })
    }
}

/// Webhook 路由
pub fn create_router(state: Arc<IgState>) -> Router {
    Router::new()
        .route("/webhook", get(webhook_verify).post(webhook_receive))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

/// Webhook 验证参数
#[derive(Debug, Deserialize)]
pub struct WebhookVerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /webhook - Meta 验证
async fn webhook_verify(
    State(state): State<Arc<IgState>>,
    Query(query): Query<WebhookVerifyQuery>,
) -> Result<String, StatusCode> {
    if query.mode.as_deref() == Some("subscribe")
        && query.verify_token.as_deref() == Some(&state.verify_token)
    {
        Ok(query.challenge.unwrap_or_default())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

/// POST /webhook - 接收私信、quick reply 与帖子评论
async fn webhook_receive(
    State(state): State<Arc<IgState>>,
    Json(payload): Json<WebhookPayload>,
) -> StatusCode {
    let Some(entries) = payload.entry else {
        return StatusCode::OK;
    };

    for entry in entries {
        let page_id = entry.id.clone();
        if let Some(messaging) = entry.messaging {
            for item in messaging {
                if let Some(event) = normalize(item) {
                    state.dispatcher.dispatch(event).await;
                }
            }
        }
        if let Some(changes) = entry.changes {
            for change in changes {
                if let Some(event) = normalize_comment(page_id.as_deref(), change) {
                    state.dispatcher.dispatch(event).await;
                }
            }
        }
    }

    StatusCode::OK
}

/// Webhook 请求体
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    pub entry: Option<Vec<WebhookEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub id: Option<String>,
    pub messaging: Option<Vec<MessagingItem>>,
    pub changes: Option<Vec<ChangeItem>>,
}

#[derive(Debug, Deserialize)]
pub struct MessagingItem {
    pub sender: Option<MessagingSender>,
    pub message: Option<IncomingMessage>,
    pub postback: Option<Postback>,
}

#[derive(Debug, Deserialize)]
pub struct MessagingSender {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub text: Option<String>,
    pub quick_reply: Option<QuickReplyIn>,
    pub is_echo: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct QuickReplyIn {
    pub payload: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Postback {
    pub payload: Option<String>,
}

/// 帖子下的变更事件（评论）
#[derive(Debug, Deserialize)]
pub struct ChangeItem {
    pub field: Option<String>,
    pub value: Option<CommentValue>,
}

#[derive(Debug, Deserialize)]
pub struct CommentValue {
    pub id: Option<String>,
    pub text: Option<String>,
    pub from: Option<MessagingSender>,
}

/// 一条 messaging 项 → 标准化事件。机器人的回声消息丢弃。
fn normalize(item: MessagingItem) -> Option<ChannelEvent> {
    let sender = item.sender?;
    let key = SessionKey::new(ChannelKind::Instagram, sender.id);
    let meta = EventMeta::default();

    if let Some(postback) = item.postback {
        let payload = postback.payload?;
        return Some(ChannelEvent {
            key,
            payload: EventPayload::Callback(payload),
            meta,
        });
    }

    let message = item.message?;
    if message.is_echo.unwrap_or(false) {
        return None;
    }
    if let Some(quick) = message.quick_reply {
        let payload = quick.payload?;
        return Some(ChannelEvent {
            key,
            payload: EventPayload::Callback(payload),
            meta,
        });
    }
    let text = message.text?;
    Some(ChannelEvent {
        key,
        payload: EventPayload::Text(text),
        meta,
    })
}

/// 一条评论变更 → 标准化事件。店铺账号自己的评论丢弃；
/// 评论 id 放进 ack_ref，投递端据此走 private reply。
fn normalize_comment(page_id: Option<&str>, change: ChangeItem) -> Option<ChannelEvent> {
    if change.field.as_deref() != Some("comments") {
        return None;
    }
    let value = change.value?;
    let from = value.from?;
    if page_id == Some(from.id.as_str()) {
        return None;
    }
    let text = value.text?;
    Some(ChannelEvent {
        key: SessionKey::new(ChannelKind::Instagram, from.id),
        payload: EventPayload::Text(text),
        meta: EventMeta {
            message_ref: None,
            ack_ref: value.id,
            display_name: None,
        },
    })
}

/// 回调按钮 → quick reply（数量与标题长度按平台上限截断）
fn quick_replies(buttons: &[Vec<Button>]) -> Vec<serde_json::Value> {
    buttons
        .iter()
        .flatten()
        .filter_map(|b| match &b.action {
            ButtonAction::Callback(data) => {
                let title: String = b.label.chars().take(QUICK_REPLY_TITLE_CHARS).collect();
                Some(json!({
                    "content_type": "text",
                    "title": title,
                    "payload": data,
                }))
            }
            ButtonAction::Url(_) => None,
        })
        .take(MAX_QUICK_REPLIES)
        .collect()
}

/// 链接按钮 → 正文尾部的「标签: 地址」行
fn url_lines(buttons: &[Vec<Button>]) -> Vec<String> {
    buttons
        .iter()
        .flatten()
        .filter_map(|b| match &b.action {
            ButtonAction::Url(url) => Some(format!("{}: {}", b.label, url)),
            ButtonAction::Callback(_) => None,
        })
        .collect()
}

/// 渲染层只产出 b/i/s 标签与三个实体，这里按同一清单还原成纯文本
fn strip_html(text: &str) -> String {
    text.replace("<b>", "")
        .replace("</b>", "")
        .replace("<i>", "")
        .replace("</i>", "")
        .replace("<s>", "")
        .replace("</s>", "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_and_quick_reply() {
        let item: MessagingItem = serde_json::from_value(json!({
            "sender": {"id": "ig9"},
            "message": {"text": "salom"}
        }))
        .unwrap();
        let event = normalize(item).unwrap();
        assert_eq!(event.key.channel, ChannelKind::Instagram);
        assert!(matches!(event.payload, EventPayload::Text(ref t) if t == "salom"));

        let item: MessagingItem = serde_json::from_value(json!({
            "sender": {"id": "ig9"},
            "message": {"text": "📂 Kategoriyalar", "quick_reply": {"payload": "categories"}}
        }))
        .unwrap();
        let event = normalize(item).unwrap();
        assert!(matches!(event.payload, EventPayload::Callback(ref d) if d == "categories"));
    }

    #[test]
    fn test_normalize_drops_echo() {
        let item: MessagingItem = serde_json::from_value(json!({
            "sender": {"id": "ig9"},
            "message": {"text": "javob", "is_echo": true}
        }))
        .unwrap();
        assert!(normalize(item).is_none());
    }

    #[test]
    fn test_normalize_comment_carries_reply_handle() {
        let change: ChangeItem = serde_json::from_value(json!({
            "field": "comments",
            "value": {
                "id": "cm77",
                "text": "narxi qancha?",
                "from": {"id": "user7"}
            }
        }))
        .unwrap();
        let event = normalize_comment(Some("page1"), change).unwrap();
        assert_eq!(event.key.user_id, "user7");
        assert!(matches!(event.payload, EventPayload::Text(ref t) if t == "narxi qancha?"));
        assert_eq!(event.meta.ack_ref.as_deref(), Some("cm77"));
    }

    #[test]
    fn test_normalize_comment_skips_own_page() {
        let change: ChangeItem = serde_json::from_value(json!({
            "field": "comments",
            "value": {"id": "cm78", "text": "rahmat!", "from": {"id": "page1"}}
        }))
        .unwrap();
        assert!(normalize_comment(Some("page1"), change).is_none());

        let other: ChangeItem = serde_json::from_value(json!({
            "field": "mentions",
            "value": {"id": "cm79", "text": "…", "from": {"id": "user7"}}
        }))
        .unwrap();
        assert!(normalize_comment(Some("page1"), other).is_none());
    }

    #[test]
    fn test_quick_replies_degrade_and_cap() {
        let rows = vec![
            vec![
                Button::cb("🔍 Qidirish", "search"),
                Button::url("🛒 Sayt", "https://shop.test"),
            ],
            vec![Button::cb(
                "📦 Juda ham uzun mahsulot nomi bu yerda",
                "product:1",
            )],
        ];
        let quick = quick_replies(&rows);
        assert_eq!(quick.len(), 2);
        assert_eq!(quick[0]["payload"], "search");
        assert!(quick[1]["title"].as_str().unwrap().chars().count() <= 20);

        let urls = url_lines(&rows);
        assert_eq!(urls, vec!["🛒 Sayt: https://shop.test".to_string()]);
    }

    #[test]
    fn test_strip_html_round() {
        assert_eq!(
            strip_html("<b>Samsung TV</b> &lt;55\"&gt; &amp; Co"),
            "Samsung TV <55\"> & Co"
        );
    }
}
