use serde::{Deserialize, Serialize};

/// 新会话及其刷新令牌（刷新接口与内部创建接口共用）
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokenResponse {
    pub session_id: String,
    pub refresh_token: String,
    /// 秒
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub logged_out: bool,
}
