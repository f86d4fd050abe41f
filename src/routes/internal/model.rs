use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::Session;
use crate::session::UserIdentitySnapshot;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLookupResponse {
    pub user_id: String,
    pub user: UserIdentitySnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendSessionResponse {
    pub session_id: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSessionsResponse {
    pub sessions: Vec<Session>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkValidateRequest {
    pub user_ids: Vec<String>,
}

/// 查询失败的用户不出现在结果里
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkValidateResponse {
    pub results: HashMap<String, bool>,
}
