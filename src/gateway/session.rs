//! 会话状态
//!
//! 每个（渠道，用户）一份：类目路径、当前结果集、待输入模式、AI 对话历史。
//! 只有路由层通过 SessionStore::update 修改；seq 与取消令牌配合，
//! 保证慢 AI 调用的结果不会盖在更新的意图后面。

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::ai::ChatTurn;

/// 待输入模式：下一条文本消息的解释方式，消费一次即清除
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingInput {
    /// 等搜索词
    SearchQuery,
    /// 等订单号或电话
    OrderQuery,
}

/// 结果集来源。翻页时按来源重发查询，不缓存旧数据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOrigin {
    Search(String),
    Category(i64),
}

/// 当前可翻页的结果集标识
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub token: Uuid,
    pub origin: PageOrigin,
    pub page: usize,
}

impl ResultSet {
    pub fn new(origin: PageOrigin) -> Self {
        Self {
            token: Uuid::new_v4(),
            origin,
            page: 0,
        }
    }

    /// 塞进回调数据的短令牌（UUID 十六进制前 8 位）
    pub fn short_token(&self) -> String {
        self.token.simple().to_string()[..8].to_string()
    }

    /// 回调里带的令牌是否指向本结果集
    pub fn matches(&self, token: &str) -> bool {
        self.short_token() == token
    }
}

/// 单用户会话状态
#[derive(Debug, Clone)]
pub struct SessionState {
    /// 类目导航路径（根到当前，元素为类目 id）
    pub category_path: Vec<i64>,
    /// 最近一次检索词
    pub last_query: Option<String>,
    /// 当前结果集（翻页与过期检测用）
    pub result: Option<ResultSet>,
    /// 待输入模式
    pub pending: Option<PendingInput>,
    /// AI 对话历史（最近几轮）
    pub turns: Vec<ChatTurn>,
    /// 意图序号：投递前校验，旧意图产物直接丢弃
    pub seq: u64,
    /// 当前意图的取消令牌，新意图到来时取消换新
    cancel: CancellationToken,
    pub created_at: Instant,
    pub last_active: Instant,
}

impl SessionState {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            category_path: Vec::new(),
            last_query: None,
            result: None,
            pending: None,
            turns: Vec::new(),
            seq: 0,
            cancel: CancellationToken::new(),
            created_at: now,
            last_active: now,
        }
    }

    /// 进入新意图：序号自增，旧取消令牌级联取消并换新
    pub fn begin_intent(&mut self) -> (u64, CancellationToken) {
        self.seq += 1;
        self.last_active = Instant::now();
        let fresh = CancellationToken::new();
        let old = std::mem::replace(&mut self.cancel, fresh.clone());
        old.cancel();
        (self.seq, fresh)
    }

    /// seq 是否仍是最新意图
    pub fn is_current(&self, seq: u64) -> bool {
        self.seq == seq
    }

    /// 记一轮 AI 对话，超出 cap 时丢最旧
    pub fn push_turn(&mut self, question: impl Into<String>, answer: impl Into<String>, cap: usize) {
        self.turns.push(ChatTurn {
            question: question.into(),
            answer: answer.into(),
        });
        while self.turns.len() > cap {
            self.turns.remove(0);
        }
    }

    /// /start：回到初始状态（序号与令牌保留，在途任务照常作废）
    pub fn reset(&mut self) {
        self.category_path.clear();
        self.last_query = None;
        self.result = None;
        self.pending = None;
        self.turns.clear();
        self.last_active = Instant::now();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
