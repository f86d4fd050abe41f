use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 会话：只保存会话ID、用户ID和创建时间，不存任何其他用户信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// 会话缓存数据模型
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    pub session_id: String,
    pub user_id: String,
    pub created_at: i64, // Unix timestamp
}

/// 会话统计（健康检查使用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total: usize,
    pub active_users: usize,
}

impl From<&Session> for CachedSession {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            user_id: session.user_id.clone(),
            created_at: session.created_at.timestamp(),
        }
    }
}

impl From<CachedSession> for Session {
    fn from(cached: CachedSession) -> Self {
        Self {
            session_id: cached.session_id,
            user_id: cached.user_id,
            created_at: DateTime::from_timestamp(cached.created_at, 0).unwrap_or_else(Utc::now),
        }
    }
}
