//! 可观测性
//!
//! tracing 初始化：默认 info，RUST_LOG 可按模块覆盖
//! （如 `RUST_LOG=savdo::gateway=debug`）。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();
}
