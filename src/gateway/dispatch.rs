//! 事件分发
//!
//! 每个（渠道，用户）一条 lane：无界 mpsc + 常驻 worker。
//! 同一用户的事件严格按到达顺序处理，不同用户完全并行；
//! 慢操作（AI 兜底）由路由层自行挪到 lane 外，不在这里阻塞后续事件。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::gateway::intent::{ChannelEvent, SessionKey};
use crate::gateway::router::ChannelRouter;

/// 事件分发器
pub struct Dispatcher {
    router: Arc<ChannelRouter>,
    lanes: RwLock<HashMap<SessionKey, mpsc::UnboundedSender<ChannelEvent>>>,
}

impl Dispatcher {
    pub fn new(router: Arc<ChannelRouter>) -> Self {
        Self {
            router,
            lanes: RwLock::new(HashMap::new()),
        }
    }

    pub fn router(&self) -> &Arc<ChannelRouter> {
        &self.router
    }

    /// 入队一条渠道事件，lane 不存在则先建
    pub async fn dispatch(&self, event: ChannelEvent) {
        let key = event.key.clone();
        let tx = self.lane(&key).await;
        if let Err(mpsc::error::SendError(event)) = tx.send(event) {
            // worker 意外退出，重建 lane 再投一次
            tracing::error!(session = %key, "lane worker gone, rebuilding");
            self.lanes.write().await.remove(&key);
            let tx = self.lane(&key).await;
            if tx.send(event).is_err() {
                tracing::error!(session = %key, "event dropped after lane rebuild");
            }
        }
    }

    async fn lane(&self, key: &SessionKey) -> mpsc::UnboundedSender<ChannelEvent> {
        {
            let lanes = self.lanes.read().await;
            if let Some(tx) = lanes.get(key) {
                return tx.clone();
            }
        }

        let mut lanes = self.lanes.write().await;
        if let Some(tx) = lanes.get(key) {
            return tx.clone();
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<ChannelEvent>();
        let router = Arc::clone(&self.router);
        let worker_key = key.clone();
        tokio::spawn(async move {
            tracing::debug!(session = %worker_key, "lane worker started");
            while let Some(event) = rx.recv().await {
                router.handle(event).await;
            }
            tracing::debug!(session = %worker_key, "lane worker stopped");
        });
        lanes.insert(key.clone(), tx.clone());
        tx
    }

    /// 已建 lane 数（监控 / 测试用）
    pub async fn lane_count(&self) -> usize {
        self.lanes.read().await.len()
    }
}
