use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 用户数据库实体（只读取校验需要的列）
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: String,
    pub is_active: bool,
    pub is_banned: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// 新建一个正常状态的用户记录
    pub fn active(id: &str, username: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            email: format!("{}@example.com", username),
            username: username.to_string(),
            role: role.to_string(),
            is_active: true,
            is_banned: false,
            deleted_at: None,
        }
    }
}
