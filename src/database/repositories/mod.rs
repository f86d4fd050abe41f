use async_trait::async_trait;

use crate::database::models::UserRecord;
use crate::error::GatewayResult;

pub mod memory;
pub mod user;

pub use memory::MemoryUserRepository;
pub use user::PgUserRepository;

/// 权威用户数据源
///
/// 每次调用都必须直接读取数据源，不做任何缓存。
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> GatewayResult<Option<UserRecord>>;
}
