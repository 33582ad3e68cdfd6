//! 会话存储
//!
//! 键 → 会话的并发映射。外层读写锁只护映射结构；每个会话自带互斥锁，
//! 同一用户的更新互相串行，不同用户完全并行。首次访问即创建，不设过期
//! （过期回收属于外围运维关注点，不在本层）。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::gateway::intent::SessionKey;
use crate::gateway::session::SessionState;

/// 会话存储
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionKey, Arc<Mutex<SessionState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// 取会话句柄，不存在则创建默认会话
    async fn entry(&self, key: &SessionKey) -> Arc<Mutex<SessionState>> {
        {
            let map = self.sessions.read().await;
            if let Some(slot) = map.get(key) {
                return Arc::clone(slot);
            }
        }
        let mut map = self.sessions.write().await;
        Arc::clone(
            map.entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(SessionState::new()))),
        )
    }

    /// 读一份会话快照
    pub async fn snapshot(&self, key: &SessionKey) -> SessionState {
        let slot = self.entry(key).await;
        let state = slot.lock().await;
        state.clone()
    }

    /// 在会话锁内执行修改，同键更新原子串行
    pub async fn update<R>(&self, key: &SessionKey, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let slot = self.entry(key).await;
        let mut state = slot.lock().await;
        f(&mut state)
    }

    /// 活跃会话数
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::intent::ChannelKind;

    fn key(user: &str) -> SessionKey {
        SessionKey::new(ChannelKind::Telegram, user)
    }

    #[tokio::test]
    async fn test_get_creates_default_session() {
        let store = SessionStore::new();
        let s = store.snapshot(&key("u1")).await;
        assert!(s.category_path.is_empty());
        assert_eq!(s.seq, 0);
        assert_eq!(store.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_persists() {
        let store = SessionStore::new();
        let k = key("u1");
        store.update(&k, |s| s.category_path.push(42)).await;
        let s = store.snapshot(&k).await;
        assert_eq!(s.category_path, vec![42]);
    }

    #[tokio::test]
    async fn test_concurrent_updates_same_key_all_applied() {
        let store = Arc::new(SessionStore::new());
        let k = key("u1");

        let mut handles = Vec::new();
        for _ in 0..100 {
            let store = Arc::clone(&store);
            let k = k.clone();
            handles.push(tokio::spawn(async move {
                store.update(&k, |s| s.seq += 1).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.snapshot(&k).await.seq, 100);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = Arc::new(SessionStore::new());
        let k1 = key("u1");
        let k2 = SessionKey::new(ChannelKind::Instagram, "u1");

        store.update(&k1, |s| s.category_path.push(1)).await;
        store.update(&k2, |s| s.category_path.push(2)).await;

        assert_eq!(store.snapshot(&k1).await.category_path, vec![1]);
        assert_eq!(store.snapshot(&k2).await.category_path, vec![2]);
        assert_eq!(store.active_count().await, 2);
    }
}
