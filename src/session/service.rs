use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Session, SessionStore};
use crate::error::{GatewayError, GatewayResult};
use crate::utils::{generate_session_id, short_id};

use super::oracle::{UserIdentitySnapshot, UserValidityOracle};

/// 校验通过的会话及本次请求读取到的用户快照
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub session: Session,
    pub user: UserIdentitySnapshot,
}

/// 会话服务
///
/// 生命周期：CREATED -> ACTIVE -> ROTATED | INVALIDATED | EXPIRED。
/// 存储里没有记录即视为已登出。
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    oracle: UserValidityOracle,
    ttl: Duration,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, oracle: UserValidityOracle, ttl: Duration) -> Self {
        Self { store, oracle, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn oracle(&self) -> &UserValidityOracle {
        &self.oracle
    }

    /// 登录时创建会话，用户必须有效
    pub async fn create_session(&self, user_id: &str) -> GatewayResult<Session> {
        if !self.oracle.is_valid(user_id).await? {
            tracing::info!(user_id = %user_id, "Refusing to create session for invalid user");
            return Err(GatewayError::UserInvalid);
        }

        let session_id = generate_session_id();
        let session = self.store.create(&session_id, user_id, self.ttl).await?;
        self.mark_presence(user_id, true).await;

        tracing::info!(user_id = %user_id, session = short_id(&session_id), "Created session");
        Ok(session)
    }

    /// 校验会话：查存储 -> 重新读取用户 -> 延长 TTL
    pub async fn validate_session(&self, session_id: &str) -> GatewayResult<ValidatedSession> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or(GatewayError::SessionNotFound)?;

        let user = match self.oracle.validate_and_fetch(&session.user_id).await {
            Ok(user) => user,
            Err(GatewayError::UserInvalid) => {
                // 用户已失效，顺手删掉会话
                if let Err(e) = self.store.delete(session_id).await {
                    tracing::warn!(
                        session = short_id(session_id),
                        error = %e,
                        "Failed to delete session of invalid user"
                    );
                }
                self.mark_offline_if_idle(&session.user_id).await;
                return Err(GatewayError::UserInvalid);
            }
            Err(e) => return Err(e),
        };

        // get 与 touch 之间过期的会话按不存在处理
        if !self.store.touch(session_id, self.ttl).await? {
            return Err(GatewayError::SessionNotFound);
        }

        Ok(ValidatedSession { session, user })
    }

    /// 轮换会话：先建新会话，再删旧会话
    ///
    /// 两步之间没有事务。进程在中间崩溃会留下两个有效会话，
    /// 多出来的会话在 TTL 到期后消失。
    pub async fn rotate_session(&self, old_session_id: &str) -> GatewayResult<ValidatedSession> {
        let current = self.validate_session(old_session_id).await?;
        let user_id = current.session.user_id.clone();

        let new_id = generate_session_id();
        let session = self.store.create(&new_id, &user_id, self.ttl).await?;
        self.store.delete(old_session_id).await?;

        tracing::info!(
            user_id = %user_id,
            old_session = short_id(old_session_id),
            new_session = short_id(&new_id),
            "Rotated session"
        );
        Ok(ValidatedSession {
            session,
            user: current.user,
        })
    }

    /// 登出单个会话，返回会话是否存在
    pub async fn invalidate_session(&self, session_id: &str) -> GatewayResult<bool> {
        let session = match self.store.get(session_id).await? {
            Some(session) => session,
            None => return Ok(false),
        };

        let removed = self.store.delete(session_id).await?;
        self.mark_offline_if_idle(&session.user_id).await;

        tracing::info!(
            user_id = %session.user_id,
            session = short_id(session_id),
            "Invalidated session"
        );
        Ok(removed)
    }

    /// 删除用户的全部会话（多设备），返回删除数量
    pub async fn invalidate_all_for_user(&self, user_id: &str) -> GatewayResult<usize> {
        let sessions = self.store.list_by_user(user_id).await?;

        let mut removed = 0;
        for session in &sessions {
            if self.store.delete(&session.session_id).await? {
                removed += 1;
            }
        }
        self.mark_offline_if_idle(user_id).await;

        tracing::info!(user_id = %user_id, count = removed, "Invalidated all sessions");
        Ok(removed)
    }

    /// 心跳：只刷新 TTL，不重新校验用户
    pub async fn extend_session(&self, session_id: &str) -> GatewayResult<()> {
        if self.store.touch(session_id, self.ttl).await? {
            Ok(())
        } else {
            Err(GatewayError::SessionNotFound)
        }
    }

    pub async fn list_sessions(&self, user_id: &str) -> GatewayResult<Vec<Session>> {
        self.store.list_by_user(user_id).await
    }

    /// 在线状态只是尽力而为，失败不影响主流程
    async fn mark_presence(&self, user_id: &str, online: bool) {
        if let Err(e) = self.store.set_presence(user_id, online, self.ttl).await {
            tracing::warn!(user_id = %user_id, online, error = %e, "Failed to update presence");
        }
    }

    /// 没有剩余会话时标记离线（跨设备不保证原子性）
    async fn mark_offline_if_idle(&self, user_id: &str) {
        match self.store.list_by_user(user_id).await {
            Ok(remaining) if remaining.is_empty() => self.mark_presence(user_id, false).await,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to check remaining sessions")
            }
        }
    }
}
