//! 意图归一化
//!
//! 各渠道的原始事件（文本 / 按钮回调）在这里统一成 Intent，
//! 路由层对 Intent 穷举处理，渠道适配器只负责生产与消费这个固定形状。
//! 回调数据文法：`category:{id}`、`product:{id}`、`pg:{n|p}:{token}`、
//! `order_items:{id}` 与若干固定字符串。

use serde::{Deserialize, Serialize};

use crate::gateway::session::PendingInput;

/// 接入渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Telegram,
    Instagram,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::Instagram => "instagram",
        }
    }
}

/// 会话键：并发与状态的单位都是（渠道，用户）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub channel: ChannelKind,
    pub user_id: String,
}

impl SessionKey {
    pub fn new(channel: ChannelKind, user_id: impl Into<String>) -> Self {
        Self {
            channel,
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.channel.as_str(), self.user_id)
    }
}

/// 渠道侧透传信息：应答回调与「编辑原消息」所需
#[derive(Debug, Clone, Default)]
pub struct EventMeta {
    /// 产生本事件的消息在渠道内的 id（有值时优先原地编辑）
    pub message_ref: Option<String>,
    /// 渠道侧应答句柄（Telegram 的 callback_query_id，Instagram 的评论 id）
    pub ack_ref: Option<String>,
    /// 用户称呼（欢迎语用）
    pub display_name: Option<String>,
}

/// 进入网关的标准化事件
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    pub key: SessionKey,
    pub payload: EventPayload,
    pub meta: EventMeta,
}

/// 事件载荷：自由文本或按钮回调数据
#[derive(Debug, Clone)]
pub enum EventPayload {
    Text(String),
    Callback(String),
}

/// 翻页方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDir {
    Next,
    Prev,
}

/// 归一化后的用户意图
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// /start：清空会话，发欢迎语
    Start,
    /// 回到主菜单（也充当「取消待输入」）
    MainMenu,
    /// 打开根类目列表
    BrowseCategories,
    /// 进入某个类目
    SelectCategory { id: i64 },
    /// 查看商品卡片
    SelectProduct { id: i64 },
    /// 当前结果集翻页；token 标识结果集，旧消息上的按钮会带过期 token
    Paginate { dir: PageDir, token: String },
    /// 返回上一级类目
    NavigateBack,
    /// 进入「等待搜索词」模式
    PromptSearch,
    /// 进入「等待订单号 / 电话」模式
    PromptOrder,
    /// 待搜索模式下收到的查询词（强制先查目录）
    Search { query: String },
    /// 自由文本：目录检索与 AI 兜底二选一
    TextQuery { text: String },
    /// 按订单号查询
    LookupOrder { id: i64 },
    /// 按电话号码查询最近订单
    OrdersByPhone { phone: String },
    /// 查看订单内商品清单
    OrderItems { id: i64 },
    Help,
    Contact,
}

pub const CB_MAIN_MENU: &str = "main_menu";
pub const CB_CATEGORIES: &str = "categories";
pub const CB_SEARCH: &str = "search";
pub const CB_ORDER: &str = "order";
pub const CB_HELP: &str = "help";
pub const CB_CONTACT: &str = "contact";
pub const CB_BACK: &str = "back";

pub fn cb_category(id: i64) -> String {
    format!("category:{}", id)
}

pub fn cb_product(id: i64) -> String {
    format!("product:{}", id)
}

pub fn cb_page(dir: PageDir, token: &str) -> String {
    let d = match dir {
        PageDir::Next => 'n',
        PageDir::Prev => 'p',
    };
    format!("pg:{}:{}", d, token)
}

pub fn cb_order_items(id: i64) -> String {
    format!("order_items:{}", id)
}

/// 解析按钮回调数据。不认识的数据返回 None（旧版本按钮），由路由层静默忽略。
pub fn parse_callback(data: &str) -> Option<Intent> {
    match data {
        CB_MAIN_MENU | "cancel" => return Some(Intent::MainMenu),
        CB_CATEGORIES => return Some(Intent::BrowseCategories),
        CB_SEARCH => return Some(Intent::PromptSearch),
        CB_ORDER => return Some(Intent::PromptOrder),
        CB_HELP => return Some(Intent::Help),
        CB_CONTACT => return Some(Intent::Contact),
        CB_BACK => return Some(Intent::NavigateBack),
        _ => {}
    }

    if let Some(rest) = data.strip_prefix("category:") {
        return rest.parse().ok().map(|id| Intent::SelectCategory { id });
    }
    if let Some(rest) = data.strip_prefix("product:") {
        return rest.parse().ok().map(|id| Intent::SelectProduct { id });
    }
    if let Some(rest) = data.strip_prefix("order_items:") {
        return rest.parse().ok().map(|id| Intent::OrderItems { id });
    }
    if let Some(rest) = data.strip_prefix("pg:") {
        let (dir, token) = rest.split_once(':')?;
        let dir = match dir {
            "n" => PageDir::Next,
            "p" => PageDir::Prev,
            _ => return None,
        };
        if token.is_empty() || token.len() > 32 {
            return None;
        }
        return Some(Intent::Paginate {
            dir,
            token: token.to_string(),
        });
    }

    None
}

/// 归一化一条文本消息。pending 是会话里的待输入模式，命令与之无关。
pub fn recognize_text(text: &str, pending: Option<PendingInput>) -> Intent {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix('/') {
        let cmd = rest.split_whitespace().next().unwrap_or("");
        // 群聊形如 /start@BotName
        let cmd = cmd.split('@').next().unwrap_or(cmd);
        return match cmd {
            "start" => Intent::Start,
            "search" => Intent::PromptSearch,
            "order" => Intent::PromptOrder,
            "contact" => Intent::Contact,
            _ => Intent::Help,
        };
    }

    match pending {
        Some(PendingInput::OrderQuery) => {
            if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(id) = trimmed.parse::<i64>() {
                    return Intent::LookupOrder { id };
                }
            }
            Intent::OrdersByPhone {
                phone: trimmed.to_string(),
            }
        }
        Some(PendingInput::SearchQuery) => Intent::Search {
            query: trimmed.to_string(),
        },
        None => Intent::TextQuery {
            text: trimmed.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_roundtrip() {
        assert_eq!(
            parse_callback(&cb_category(12)),
            Some(Intent::SelectCategory { id: 12 })
        );
        assert_eq!(
            parse_callback(&cb_product(101)),
            Some(Intent::SelectProduct { id: 101 })
        );
        assert_eq!(
            parse_callback(&cb_order_items(9)),
            Some(Intent::OrderItems { id: 9 })
        );
        assert_eq!(
            parse_callback(&cb_page(PageDir::Next, "a1b2c3d4")),
            Some(Intent::Paginate {
                dir: PageDir::Next,
                token: "a1b2c3d4".to_string()
            })
        );
        assert_eq!(
            parse_callback(&cb_page(PageDir::Prev, "a1b2c3d4")),
            Some(Intent::Paginate {
                dir: PageDir::Prev,
                token: "a1b2c3d4".to_string()
            })
        );
    }

    #[test]
    fn test_fixed_callbacks() {
        assert_eq!(parse_callback(CB_MAIN_MENU), Some(Intent::MainMenu));
        assert_eq!(parse_callback("cancel"), Some(Intent::MainMenu));
        assert_eq!(parse_callback(CB_BACK), Some(Intent::NavigateBack));
        assert_eq!(parse_callback(CB_CATEGORIES), Some(Intent::BrowseCategories));
    }

    #[test]
    fn test_malformed_callbacks_ignored() {
        assert_eq!(parse_callback("category:abc"), None);
        assert_eq!(parse_callback("pg:x:tok"), None);
        assert_eq!(parse_callback("pg:n:"), None);
        assert_eq!(parse_callback("something_else"), None);
    }

    #[test]
    fn test_commands() {
        assert_eq!(recognize_text("/start", None), Intent::Start);
        assert_eq!(recognize_text("/start@SavdoBot hi", None), Intent::Start);
        assert_eq!(recognize_text("/order", None), Intent::PromptOrder);
        assert_eq!(recognize_text("/nonsense", None), Intent::Help);
    }

    #[test]
    fn test_pending_order_digit_vs_phone() {
        assert_eq!(
            recognize_text("12345", Some(PendingInput::OrderQuery)),
            Intent::LookupOrder { id: 12345 }
        );
        assert_eq!(
            recognize_text("+998 90 123 45 67", Some(PendingInput::OrderQuery)),
            Intent::OrdersByPhone {
                phone: "+998 90 123 45 67".to_string()
            }
        );
    }

    #[test]
    fn test_pending_search_forces_query() {
        assert_eq!(
            recognize_text("salom", Some(PendingInput::SearchQuery)),
            Intent::Search {
                query: "salom".to_string()
            }
        );
    }

    #[test]
    fn test_free_text_default() {
        assert_eq!(
            recognize_text("  samsung tv  ", None),
            Intent::TextQuery {
                text: "samsung tv".to_string()
            }
        );
    }
}
