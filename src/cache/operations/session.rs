use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::SessionStore;
use crate::cache::keys::{SESSION_KEY_PATTERN, presence_key, session_key};
use crate::cache::models::{CachedPresence, CachedSession, Session, SessionStats};
use crate::error::{GatewayError, GatewayResult};

/// SCAN 每批数量
const SCAN_COUNT: usize = 200;

/// 基于 Redis 的会话存储，整个进程共享一个连接管理器
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn connect(url: &str) -> GatewayResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// 扫描所有会话键并批量读取
    async fn scan_sessions(&self) -> GatewayResult<Vec<Session>> {
        let mut conn = self.conn.clone();
        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(SESSION_KEY_PATTERN)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        let mut sessions = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(SCAN_COUNT) {
            let values: Vec<Option<String>> = redis::cmd("MGET")
                .arg(chunk)
                .query_async(&mut conn)
                .await?;
            // 扫描期间过期的键返回 nil，直接跳过
            for json in values.into_iter().flatten() {
                match serde_json::from_str::<CachedSession>(&json) {
                    Ok(cached) => sessions.push(Session::from(cached)),
                    Err(e) => tracing::warn!(error = %e, "Skipping malformed session record"),
                }
            }
        }

        Ok(sessions)
    }
}

/// Redis 的过期时间以秒为单位，且不能为 0
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn decode_session(json: &str) -> GatewayResult<Session> {
    let cached: CachedSession = serde_json::from_str(json)
        .map_err(|e| GatewayError::StorageUnavailable(format!("反序列化错误: {}", e)))?;
    Ok(Session::from(cached))
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(
        &self,
        session_id: &str,
        user_id: &str,
        ttl: Duration,
    ) -> GatewayResult<Session> {
        let mut conn = self.conn.clone();

        let session = Session {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&CachedSession::from(&session))
            .map_err(|e| GatewayError::Internal(format!("序列化错误: {}", e)))?;

        let _: () = conn
            .set_ex(session_key(session_id), json, expiry_secs(ttl))
            .await?;

        Ok(session)
    }

    async fn get(&self, session_id: &str) -> GatewayResult<Option<Session>> {
        let mut conn = self.conn.clone();

        let result: Option<String> = conn.get(session_key(session_id)).await?;
        result.as_deref().map(decode_session).transpose()
    }

    async fn touch(&self, session_id: &str, ttl: Duration) -> GatewayResult<bool> {
        let mut conn = self.conn.clone();

        let touched: bool = conn
            .expire(session_key(session_id), expiry_secs(ttl) as i64)
            .await?;
        Ok(touched)
    }

    async fn delete(&self, session_id: &str) -> GatewayResult<bool> {
        let mut conn = self.conn.clone();

        let removed: i64 = conn.del(session_key(session_id)).await?;
        Ok(removed > 0)
    }

    async fn list_by_user(&self, user_id: &str) -> GatewayResult<Vec<Session>> {
        let sessions = self.scan_sessions().await?;
        Ok(sessions
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect())
    }

    async fn stats(&self) -> GatewayResult<SessionStats> {
        let sessions = self.scan_sessions().await?;
        let users: HashSet<&str> = sessions.iter().map(|s| s.user_id.as_str()).collect();
        Ok(SessionStats {
            total: sessions.len(),
            active_users: users.len(),
        })
    }

    async fn set_presence(&self, user_id: &str, online: bool, ttl: Duration) -> GatewayResult<()> {
        let mut conn = self.conn.clone();

        let json = serde_json::to_string(&CachedPresence::now(user_id, online))
            .map_err(|e| GatewayError::Internal(format!("序列化错误: {}", e)))?;

        let _: () = conn
            .set_ex(presence_key(user_id), json, expiry_secs(ttl))
            .await?;
        Ok(())
    }

    async fn ping(&self) -> GatewayResult<()> {
        let mut conn = self.conn.clone();

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
