//! 会话网关
//!
//! 多渠道导购机器人的核心：渠道适配器把原始事件标准化后丢进来，
//! 这里完成意图归一、目录导航、检索解析、会话维护，再以渠道无关的
//! Render 投递回去。
//!
//! ## 数据流
//!
//! ```text
//! 渠道事件 → Dispatcher（按用户串行的 lane）
//!          → ChannelRouter（Intent 穷举执行）
//!            ├─ Navigator   类目树导航（路径自愈）
//!            ├─ Resolver    结构化检索优先，AI 兜底
//!            ├─ SessionStore 会话状态（seq + 取消令牌）
//!            └─ Renderer    乌兹别克语话术 + 按钮
//!          → RenderSink（渠道适配器投递）
//! ```
//!
//! ## 时序规则
//!
//! - 同一用户事件按到达顺序处理，不同用户完全并行
//! - 慢操作（AI）挪到 lane 外，新意图一到旧结果即作废
//! - 翻页令牌绑定结果集，旧消息上的按钮对不上令牌就提示过期

pub mod dispatch;
pub mod error;
pub mod intent;
pub mod navigator;
pub mod render;
pub mod resolver;
pub mod router;
pub mod session;
pub mod session_store;

use std::sync::Arc;

pub use dispatch::Dispatcher;
pub use error::{GatewayError, Missing};
pub use intent::{
    parse_callback, recognize_text, ChannelEvent, ChannelKind, EventMeta, EventPayload, Intent,
    PageDir, SessionKey,
};
pub use navigator::{NavOutcome, NavView, Navigator};
pub use render::{Button, ButtonAction, PageContext, Render, Renderer, STALE_NAV_NOTICE};
pub use resolver::{Resolution, Resolver};
pub use router::{ChannelRouter, RenderSink};
pub use session::{PageOrigin, PendingInput, ResultSet, SessionState};
pub use session_store::SessionStore;

use crate::catalog::create_catalog;
use crate::config::AppConfig;

/// 按配置装配整个网关：目录后端 → AI 兜底 → 解析器 → 路由器 → 分发器
pub async fn create_gateway(cfg: &AppConfig, sink: Arc<dyn RenderSink>) -> Arc<Dispatcher> {
    let catalog = create_catalog(&cfg.catalog).await;
    let adapter = crate::ai::create_fallback_adapter(&cfg.ai);
    let resolver = Arc::new(Resolver::new(Arc::clone(&catalog), adapter, cfg.shop.clone()));
    let router = Arc::new(ChannelRouter::new(cfg, catalog, resolver, sink));
    Arc::new(Dispatcher::new(router))
}
