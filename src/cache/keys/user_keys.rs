/// 在线状态键前缀，与会话键分开，SCAN `session:*` 不会扫到
const PRESENCE_PREFIX: &str = "user:status:";

pub fn presence_key(user_id: &str) -> String {
    format!("{}{}", PRESENCE_PREFIX, user_id)
}
