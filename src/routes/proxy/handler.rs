use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::Request,
};
use uuid::Uuid;

use crate::{
    AppState,
    config::matches_prefix,
    dispatch::{ForwardedRequest, ForwardedResponse, headers::HEADER_SESSION_ID},
    error::{GatewayError, GatewayResult},
    middleware::{CorrelationId, INTERNAL_PREFIX, Identity},
};

/// 兜底路由：去掉 API 前缀，按路由表找到服务后转发
pub async fn forward(
    State(state): State<AppState>,
    req: Request<Body>,
) -> GatewayResult<ForwardedResponse> {
    let (mut parts, body) = req.into_parts();
    let correlation_id = parts
        .extensions
        .get::<CorrelationId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let path = state.config.strip_api_prefix(parts.uri.path()).to_string();
    // 内部接口不经过会话守卫，绝不转发
    if matches_prefix(&path, INTERNAL_PREFIX) {
        return Err(GatewayError::RouteNotFound(path));
    }
    let service = state
        .config
        .routes
        .resolve(&path)
        .ok_or_else(|| GatewayError::RouteNotFound(path.clone()))?
        .to_string();

    let path = match parts.uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    // 只有经过会话校验的请求才携带网关写入的会话头
    if parts.extensions.get::<Identity>().is_none() {
        parts.headers.remove(HEADER_SESSION_ID);
    }

    let body = to_bytes(body, state.config.max_body_bytes)
        .await
        .map_err(|e| GatewayError::BadRequest(format!("failed to read request body: {}", e)))?;

    state
        .dispatcher
        .forward(
            &service,
            ForwardedRequest {
                method: parts.method,
                path,
                headers: parts.headers,
                body,
                correlation_id,
            },
        )
        .await
}
