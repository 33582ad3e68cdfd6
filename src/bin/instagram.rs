//! Savdo Instagram 服务
//!
//! 通过 Meta Graph API Webhook 接收 Instagram 私信，复用同一个网关核心。
//!
//! 环境变量:
//! - IG_ACCESS_TOKEN: Graph API 访问令牌
//! - IG_VERIFY_TOKEN: Webhook 验证令牌
//! - GEMINI_API_KEY / OPENAI_API_KEY: AI 兜底密钥（缺失则用 Mock 回答）
//! - DATABASE_URL: MySQL 目录连接串（--features mysql 时生效）
//!
//! 启动: cargo run --bin savdo-instagram --features instagram

#[cfg(feature = "instagram")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::path::PathBuf;
    use std::sync::Arc;

    use anyhow::Context;
    use savdo::channels::{create_instagram_router, IgState, InstagramChannel};
    use savdo::gateway::{create_gateway, RenderSink};

    savdo::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = savdo::load_config(config_path).context("Failed to load config")?;

    let channel = Arc::new(
        InstagramChannel::from_env(&cfg.instagram).context("Instagram channel init failed")?,
    );
    let dispatcher = create_gateway(&cfg, Arc::clone(&channel) as Arc<dyn RenderSink>).await;
    let state = Arc::new(IgState::from_env(dispatcher)?);

    let app = create_instagram_router(state);
    let listener = tokio::net::TcpListener::bind(&cfg.instagram.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.instagram.bind))?;
    tracing::info!(bind = %cfg.instagram.bind, "instagram webhook listening");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "instagram"))]
fn main() {
    eprintln!("请使用 --features instagram 编译: cargo run --bin savdo-instagram --features instagram");
    std::process::exit(1);
}
