/// 缓存数据模型
pub mod session;
pub mod user;

pub use session::{CachedSession, Session, SessionStats};
pub use user::CachedPresence;
