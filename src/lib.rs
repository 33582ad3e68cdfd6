//! Savdo - Rust 会话式电商网关
//!
//! 多渠道导购机器人核心：商品目录导航、二级检索（结构化优先 + AI 兜底）、
//! 订单查询与会话状态管理。
//!
//! 模块划分：
//! - **ai**: 自由问答后端（Gemini / OpenAI 兼容 / Mock）与兜底边界
//! - **catalog**: 外部商城数据库的只读访问、分页与数据模型
//! - **channels**: 渠道适配器（Telegram 长轮询、Instagram Webhook）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **gateway**: 意图路由、类目导航、检索解析、会话与渲染
//! - **observability**: tracing 初始化

pub mod ai;
pub mod catalog;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod observability;

pub use config::{load_config, AppConfig};
pub use gateway::create_gateway;
