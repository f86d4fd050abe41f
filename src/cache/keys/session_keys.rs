/// 会话缓存键前缀
const SESSION_PREFIX: &str = "session:";

/// 扫描全部会话时使用的匹配模式
pub const SESSION_KEY_PATTERN: &str = "session:*";

/// 生成会话缓存键
pub fn session_key(session_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, session_id)
}
