/// 缓存操作
/// 会话存储的接口及其 Redis / 内存实现
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::models::{Session, SessionStats};
use crate::error::GatewayResult;

pub mod memory;
pub mod session;

pub use memory::MemorySessionStore;
pub use session::RedisSessionStore;

/// 会话存储
///
/// 每个操作对单个键是原子的；组合操作（如轮换）不具备事务性。
/// 后端不可达时返回 `StorageUnavailable`，不排队、不重试。
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 写入新会话并设置 TTL
    async fn create(&self, session_id: &str, user_id: &str, ttl: Duration)
    -> GatewayResult<Session>;

    async fn get(&self, session_id: &str) -> GatewayResult<Option<Session>>;

    /// 重置 TTL（滑动过期）。会话不存在时返回 false
    async fn touch(&self, session_id: &str, ttl: Duration) -> GatewayResult<bool>;

    /// 幂等删除，返回是否真的删掉了记录
    async fn delete(&self, session_id: &str) -> GatewayResult<bool>;

    /// 全量扫描，O(n)
    async fn list_by_user(&self, user_id: &str) -> GatewayResult<Vec<Session>>;

    /// 全量扫描，O(n)
    async fn stats(&self) -> GatewayResult<SessionStats>;

    /// 记录用户在线/离线
    async fn set_presence(&self, user_id: &str, online: bool, ttl: Duration) -> GatewayResult<()>;

    async fn ping(&self) -> GatewayResult<()>;
}
