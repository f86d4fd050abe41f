use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;

use super::SessionStore;
use crate::cache::models::{CachedPresence, CachedSession, Session, SessionStats};
use crate::error::{GatewayError, GatewayResult};

/// 进程内会话存储，语义与 Redis 实现一致（含 TTL）
///
/// 用于测试和没有 Redis 的本地开发；`set_unavailable` 可以模拟存储故障。
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, (CachedSession, Instant)>>,
    presence: Mutex<HashMap<String, CachedPresence>>,
    unavailable: AtomicBool,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟存储不可达
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 会话剩余 TTL
    pub fn ttl_remaining(&self, session_id: &str) -> Option<Duration> {
        let now = Instant::now();
        self.live_sessions()
            .get(session_id)
            .map(|(_, expires_at)| expires_at.saturating_duration_since(now))
    }

    /// 最近一次记录的在线状态
    pub fn presence(&self, user_id: &str) -> Option<bool> {
        self.presence
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .map(|status| status.online)
    }

    fn check_available(&self) -> GatewayResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::StorageUnavailable(
                "in-memory store marked unavailable".into(),
            ));
        }
        Ok(())
    }

    /// 取锁并顺便清理过期会话
    fn live_sessions(&self) -> MutexGuard<'_, HashMap<String, (CachedSession, Instant)>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        sessions
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        session_id: &str,
        user_id: &str,
        ttl: Duration,
    ) -> GatewayResult<Session> {
        self.check_available()?;

        let session = Session {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        self.live_sessions().insert(
            session_id.to_string(),
            (CachedSession::from(&session), Instant::now() + ttl),
        );
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> GatewayResult<Option<Session>> {
        self.check_available()?;

        Ok(self
            .live_sessions()
            .get(session_id)
            .map(|(cached, _)| Session::from(cached.clone())))
    }

    async fn touch(&self, session_id: &str, ttl: Duration) -> GatewayResult<bool> {
        self.check_available()?;

        match self.live_sessions().get_mut(session_id) {
            Some((_, expires_at)) => {
                *expires_at = Instant::now() + ttl;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, session_id: &str) -> GatewayResult<bool> {
        self.check_available()?;

        Ok(self.live_sessions().remove(session_id).is_some())
    }

    async fn list_by_user(&self, user_id: &str) -> GatewayResult<Vec<Session>> {
        self.check_available()?;

        Ok(self
            .live_sessions()
            .values()
            .filter(|(cached, _)| cached.user_id == user_id)
            .map(|(cached, _)| Session::from(cached.clone()))
            .collect())
    }

    async fn stats(&self) -> GatewayResult<SessionStats> {
        self.check_available()?;

        let sessions = self.live_sessions();
        let users: HashSet<&str> = sessions
            .values()
            .map(|(cached, _)| cached.user_id.as_str())
            .collect();
        Ok(SessionStats {
            total: sessions.len(),
            active_users: users.len(),
        })
    }

    async fn set_presence(&self, user_id: &str, online: bool, _ttl: Duration) -> GatewayResult<()> {
        self.check_available()?;

        self.presence
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id.to_string(), CachedPresence::now(user_id, online));
        Ok(())
    }

    async fn ping(&self) -> GatewayResult<()> {
        self.check_available()
    }
}
