use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 在线状态标记，由会话服务在登录/登出时写入
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CachedPresence {
    pub user_id: String,
    pub online: bool,
    pub last_activity: i64, // Unix timestamp
}

impl CachedPresence {
    pub fn now(user_id: &str, online: bool) -> Self {
        Self {
            user_id: user_id.to_string(),
            online,
            last_activity: Utc::now().timestamp(),
        }
    }
}
