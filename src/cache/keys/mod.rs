/// 缓存键模块
/// 提供各种缓存键生成函数
pub mod session_keys;
pub mod user_keys;

pub use session_keys::{SESSION_KEY_PATTERN, session_key};
pub use user_keys::presence_key;
