//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SAVDO__*` 覆盖（双下划线表示嵌套，
//! 如 `SAVDO__CATALOG__BACKEND=mysql`）。密钥类（Bot Token / API Key / 连接串）
//! 不进配置文件，只认独立环境变量：TELEGRAM_BOT_TOKEN、GEMINI_API_KEY、
//! OPENAI_API_KEY、DATABASE_URL、IG_ACCESS_TOKEN、IG_VERIFY_TOKEN。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub shop: ShopSection,
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub instagram: InstagramSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            catalog: CatalogSection::default(),
            ai: AiSection::default(),
            shop: ShopSection::default(),
            telegram: TelegramSection::default(),
            instagram: InstagramSection::default(),
        }
    }
}

/// [app] 段：应用名与会话上下文上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 发给 AI 的对话历史保留轮数（一轮 = 提问 + 回答）
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            max_context_turns: default_max_context_turns(),
        }
    }
}

fn default_max_context_turns() -> usize {
    2
}

/// [catalog] 段：后端选择、查询边界与分页
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// 后端：memory / mysql
    #[serde(default = "default_catalog_backend")]
    pub backend: String,
    /// MySQL 连接串（非密钥场景的本地默认值；生产用 DATABASE_URL 覆盖）
    pub url: Option<String>,
    /// 商城表前缀
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// 商城站点根地址，商品图片 URL 据此拼出；不设则卡片不带图
    pub base_url: Option<String>,
    /// 单次目录查询超时（毫秒）
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// 瞬时失败的追加重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// 标题检索返回上限
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// 每页商品数
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            backend: default_catalog_backend(),
            url: None,
            table_prefix: default_table_prefix(),
            base_url: None,
            query_timeout_ms: default_query_timeout_ms(),
            max_retries: default_max_retries(),
            search_limit: default_search_limit(),
            page_size: default_page_size(),
        }
    }
}

fn default_catalog_backend() -> String {
    "memory".to_string()
}

fn default_table_prefix() -> String {
    "mg_".to_string()
}

fn default_query_timeout_ms() -> u64 {
    800
}

fn default_max_retries() -> u32 {
    2
}

fn default_search_limit() -> usize {
    50
}

fn default_page_size() -> usize {
    5
}

/// [ai] 段：后端选择与兜底边界
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiSection {
    /// 后端：gemini / openai / mock
    #[serde(default = "default_ai_provider")]
    pub provider: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 整次问答（含重试）的总超时（秒）
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
    /// 限流时的最大尝试次数
    #[serde(default = "default_ai_max_attempts")]
    pub max_attempts: u32,
    /// 限流退避基础间隔（毫秒），每次翻倍
    #[serde(default = "default_ai_base_delay_ms")]
    pub base_delay_ms: u64,
    /// 回答长度上限（字符）
    #[serde(default = "default_ai_max_answer_chars")]
    pub max_answer_chars: usize,
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            model: default_ai_model(),
            base_url: None,
            timeout_secs: default_ai_timeout_secs(),
            max_attempts: default_ai_max_attempts(),
            base_delay_ms: default_ai_base_delay_ms(),
            max_answer_chars: default_ai_max_answer_chars(),
        }
    }
}

fn default_ai_provider() -> String {
    "gemini".to_string()
}

fn default_ai_model() -> String {
    crate::ai::GEMINI_FLASH_LITE.to_string()
}

fn default_ai_timeout_secs() -> u64 {
    12
}

fn default_ai_max_attempts() -> u32 {
    3
}

fn default_ai_base_delay_ms() -> u64 {
    800
}

fn default_ai_max_answer_chars() -> usize {
    3500
}

/// [shop] 段：店铺资料，AI 系统提示词与「联系我们」页面的数据源
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShopSection {
    #[serde(default = "default_shop_name")]
    pub name: String,
    #[serde(default = "default_shop_description")]
    pub description: String,
    #[serde(default = "default_shop_delivery")]
    pub delivery: String,
    #[serde(default = "default_shop_payment")]
    pub payment: String,
    #[serde(default = "default_shop_working_hours")]
    pub working_hours: String,
    #[serde(default = "default_shop_phone")]
    pub phone: String,
    #[serde(default = "default_shop_address")]
    pub address: String,
    #[serde(default = "default_shop_tone")]
    pub tone: String,
    /// Telegram 频道链接，主菜单「Kanalimiz」按钮；不设则不显示
    pub channel_url: Option<String>,
}

impl Default for ShopSection {
    fn default() -> Self {
        Self {
            name: default_shop_name(),
            description: default_shop_description(),
            delivery: default_shop_delivery(),
            payment: default_shop_payment(),
            working_hours: default_shop_working_hours(),
            phone: default_shop_phone(),
            address: default_shop_address(),
            tone: default_shop_tone(),
            channel_url: None,
        }
    }
}

fn default_shop_name() -> String {
    "OptomMarket".to_string()
}

fn default_shop_description() -> String {
    "Optom va chakana savdo do'koni".to_string()
}

fn default_shop_delivery() -> String {
    "Toshkent bo'ylab bepul yetkazib berish. Viloyatlarga pochta orqali.".to_string()
}

fn default_shop_payment() -> String {
    "Naqd, karta (Uzcard, Humo), Click, Payme".to_string()
}

fn default_shop_working_hours() -> String {
    "Dushanba - Shanba: 9:00 - 18:00".to_string()
}

fn default_shop_phone() -> String {
    "+998 97 477 12 29".to_string()
}

fn default_shop_address() -> String {
    "Toshkent shahri".to_string()
}

fn default_shop_tone() -> String {
    "Professional, do'stona va yordamga tayyor sotuvchi konsultant. O'zbek tilida muloqot."
        .to_string()
}

/// [telegram] 段：长轮询参数；Bot Token 走 TELEGRAM_BOT_TOKEN 环境变量
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// getUpdates 长轮询等待（秒）
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            api_base: default_telegram_api_base(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

/// [instagram] 段：Webhook 监听地址与 Graph API 入口；
/// 密钥走 IG_ACCESS_TOKEN / IG_VERIFY_TOKEN 环境变量
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstagramSection {
    #[serde(default = "default_instagram_bind")]
    pub bind: String,
    #[serde(default = "default_graph_api_base")]
    pub api_base: String,
}

impl Default for InstagramSection {
    fn default() -> Self {
        Self {
            bind: default_instagram_bind(),
            api_base: default_graph_api_base(),
        }
    }
}

fn default_instagram_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_graph_api_base() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

/// 从 config 目录加载配置，环境变量 SAVDO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SAVDO__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SAVDO")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
