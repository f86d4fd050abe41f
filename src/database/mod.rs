// 数据库模块
// 权威用户数据源：用户实体和存储库

pub mod models;
pub mod repositories;

// 重新导出常用类型
pub use models::UserRecord;
pub use repositories::{MemoryUserRepository, PgUserRepository, UserRepository};
