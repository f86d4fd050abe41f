use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::database::{UserRecord, UserRepository};
use crate::error::{GatewayError, GatewayResult};

/// 用户状态，只用于内部日志；对外统一为 `UserInvalid`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
    Banned,
    Deleted,
    Missing,
}

impl UserStatus {
    pub fn of(record: Option<&UserRecord>) -> Self {
        match record {
            None => UserStatus::Missing,
            Some(u) if u.deleted_at.is_some() => UserStatus::Deleted,
            Some(u) if u.is_banned => UserStatus::Banned,
            Some(u) if !u.is_active => UserStatus::Inactive,
            Some(_) => UserStatus::Active,
        }
    }

    pub fn is_valid(self) -> bool {
        self == UserStatus::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Banned => "banned",
            UserStatus::Deleted => "deleted",
            UserStatus::Missing => "missing",
        }
    }
}

/// 单次请求内有效的用户快照，不持久化、不缓存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentitySnapshot {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: String,
    pub is_active: bool,
}

impl From<UserRecord> for UserIdentitySnapshot {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            role: user.role,
            is_active: user.is_active,
        }
    }
}

/// 用户有效性查询
///
/// 每次调用都直接读数据源。封禁、删除、角色变更在下一次调用时立即生效。
#[derive(Clone)]
pub struct UserValidityOracle {
    users: Arc<dyn UserRepository>,
}

impl UserValidityOracle {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn status(&self, user_id: &str) -> GatewayResult<(UserStatus, Option<UserRecord>)> {
        let record = self.users.find_by_id(user_id).await?;
        Ok((UserStatus::of(record.as_ref()), record))
    }

    /// active ∧ !banned ∧ !deleted
    pub async fn is_valid(&self, user_id: &str) -> GatewayResult<bool> {
        let (status, _) = self.status(user_id).await?;
        Ok(status.is_valid())
    }

    pub async fn validate_and_fetch(&self, user_id: &str) -> GatewayResult<UserIdentitySnapshot> {
        match self.status(user_id).await? {
            (UserStatus::Active, Some(record)) => Ok(UserIdentitySnapshot::from(record)),
            (status, _) => {
                tracing::info!(
                    user_id = %user_id,
                    reason = status.as_str(),
                    "User failed validity check"
                );
                Err(GatewayError::UserInvalid)
            }
        }
    }

    /// 批量校验，单个用户查询失败不影响其他用户；失败的 ID 不出现在结果里
    pub async fn bulk_validate(&self, user_ids: &[String]) -> HashMap<String, bool> {
        let lookups = user_ids.iter().map(|id| async move {
            let result = self.is_valid(id).await;
            (id.clone(), result)
        });

        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(valid) => Some((id, valid)),
                Err(e) => {
                    tracing::warn!(user_id = %id, error = %e, "Bulk validation lookup failed");
                    None
                }
            })
            .collect()
    }
}
