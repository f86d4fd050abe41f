// 缓存模块
// 会话存储：Redis 键布局、缓存数据结构和操作

pub mod keys;
pub mod models;
pub mod operations;

// 重新导出常用类型，方便其他模块使用
pub use models::{Session, SessionStats};
pub use operations::{MemorySessionStore, RedisSessionStore, SessionStore};
