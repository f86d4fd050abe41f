use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 网关错误类型
///
/// 对外只暴露统一的错误信封，具体原因只写日志。
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no session credential presented")]
    MissingCredential,

    #[error("session not found")]
    SessionNotFound,

    #[error("user is not valid")]
    UserInvalid,

    #[error("signed token rejected: {0}")]
    TokenInvalid(String),

    #[error("service '{0}' is not registered")]
    ServiceUnknown(String),

    #[error("service '{service}' unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    #[error("session store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("user source unavailable: {0}")]
    UserSourceUnavailable(String),

    #[error("no route for path '{0}'")]
    RouteNotFound(String),

    #[error("internal request credential rejected")]
    Forbidden,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// 日志中使用的错误种类名
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::MissingCredential => "MissingCredential",
            GatewayError::SessionNotFound => "SessionNotFound",
            GatewayError::UserInvalid => "UserInvalid",
            GatewayError::TokenInvalid(_) => "TokenInvalid",
            GatewayError::ServiceUnknown(_) => "ServiceUnknown",
            GatewayError::ServiceUnavailable { .. } => "ServiceUnavailable",
            GatewayError::StorageUnavailable(_) => "StorageUnavailable",
            GatewayError::UserSourceUnavailable(_) => "UserSourceUnavailable",
            GatewayError::RouteNotFound(_) => "RouteNotFound",
            GatewayError::Forbidden => "Forbidden",
            GatewayError::BadRequest(_) => "BadRequest",
            GatewayError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingCredential
            | GatewayError::SessionNotFound
            | GatewayError::UserInvalid
            | GatewayError::TokenInvalid(_) => StatusCode::UNAUTHORIZED,
            GatewayError::ServiceUnknown(_) => StatusCode::BAD_GATEWAY,
            GatewayError::ServiceUnavailable { .. } | GatewayError::UserSourceUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::StorageUnavailable(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// 认证类失败（会话不存在、用户失效、令牌无效）
    pub fn is_auth_failure(&self) -> bool {
        self.status() == StatusCode::UNAUTHORIZED
    }

    fn public_message(&self) -> &'static str {
        match self.status() {
            // 所有 401 使用同一条消息，避免泄露账号状态
            StatusCode::UNAUTHORIZED => "Unauthorized",
            StatusCode::BAD_GATEWAY => "Bad Gateway",
            StatusCode::SERVICE_UNAVAILABLE => "Service Unavailable",
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::FORBIDDEN => "Forbidden",
            StatusCode::BAD_REQUEST => "Bad Request",
            _ => "Internal Server Error",
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(e: JsonRejection) -> Self {
        GatewayError::BadRequest(e.body_text())
    }
}

impl From<redis::RedisError> for GatewayError {
    fn from(e: redis::RedisError) -> Self {
        GatewayError::StorageUnavailable(e.to_string())
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        GatewayError::UserSourceUnavailable(e.to_string())
    }
}

/// 统一错误信封
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub message: String,
    pub timestamp: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorEnvelope::new(status, self.public_message()));

        (status, body).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
