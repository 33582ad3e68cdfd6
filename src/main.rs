//! Savdo Telegram Bot 入口
//!
//! 初始化日志与配置，装配网关（目录 → AI 兜底 → 路由 → 分发），
//! 然后进入 Telegram 长轮询。
//!
//! 环境变量:
//! - TELEGRAM_BOT_TOKEN: Bot API 令牌（必填）
//! - GEMINI_API_KEY / OPENAI_API_KEY: AI 兜底密钥（缺失则用 Mock 回答）
//! - DATABASE_URL: MySQL 目录连接串（--features mysql 时生效）
//! - SAVDO__*: 覆盖 config/default.toml 里的任意键
//!
//! 启动: cargo run --bin savdo

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use savdo::channels::TelegramChannel;
use savdo::gateway::{create_gateway, RenderSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    savdo::observability::init();

    // 可选的第一个参数：额外配置文件路径
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = savdo::load_config(config_path).context("Failed to load config")?;
    tracing::info!(
        shop = %cfg.shop.name,
        catalog = %cfg.catalog.backend,
        ai = %cfg.ai.provider,
        "starting savdo gateway"
    );

    let channel = Arc::new(
        TelegramChannel::from_env(&cfg.telegram).context("Telegram channel init failed")?,
    );
    let dispatcher = create_gateway(&cfg, Arc::clone(&channel) as Arc<dyn RenderSink>).await;

    channel
        .run(dispatcher)
        .await
        .context("Telegram polling stopped")?;

    Ok(())
}
