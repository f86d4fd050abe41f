use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use super::UserRepository;
use crate::database::models::UserRecord;
use crate::error::{GatewayError, GatewayResult};

/// 内存用户存储库，写入在下一次读取时立即可见
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<String, UserRecord>>,
    failing: RwLock<Vec<String>>,
    unavailable: AtomicBool,
    lookups: AtomicUsize,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I: IntoIterator<Item = UserRecord>>(users: I) -> Self {
        let repo = Self::new();
        for user in users {
            repo.upsert(user);
        }
        repo
    }

    pub fn upsert(&self, user: UserRecord) {
        self.users
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user.id.clone(), user);
    }

    pub fn ban(&self, user_id: &str) {
        self.update(user_id, |u| u.is_banned = true);
    }

    pub fn deactivate(&self, user_id: &str) {
        self.update(user_id, |u| u.is_active = false);
    }

    pub fn delete(&self, user_id: &str) {
        self.update(user_id, |u| u.deleted_at = Some(Utc::now()));
    }

    pub fn set_role(&self, user_id: &str, role: &str) {
        self.update(user_id, |u| u.role = role.to_string());
    }

    /// 让某个用户的查询失败（模拟单条查询出错）
    pub fn fail_lookups_for(&self, user_id: &str) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(user_id.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 累计查询次数
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn update<F: FnOnce(&mut UserRecord)>(&self, user_id: &str, f: F) {
        if let Some(user) = self
            .users
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(user_id)
        {
            f(user);
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, user_id: &str) -> GatewayResult<Option<UserRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|id| id == user_id);
        if failing || self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::UserSourceUnavailable(format!(
                "lookup failed for {}",
                user_id
            )));
        }

        Ok(self
            .users
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned())
    }
}
