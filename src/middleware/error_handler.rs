use axum::{
    body::{Body, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

use super::correlation::CorrelationId;
use crate::dispatch::Relayed;

/// 日志中保留的响应体长度上限
const LOGGED_BODY_LIMIT: usize = 1024;

/// 记录所有 5xx 响应（状态码、响应体、关联 ID）
///
/// 下游回传的响应只记录状态码，内容原样放行。
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let correlation_id = req
        .extensions()
        .get::<CorrelationId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    if response.extensions().get::<Relayed>().is_some() {
        error!(
            correlation_id = %correlation_id,
            path = %path,
            "Downstream server error relayed - Status: {}",
            response.status()
        );
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            error!(correlation_id = %correlation_id, "Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };
    let logged = &bytes[..bytes.len().min(LOGGED_BODY_LIMIT)];
    let body_str = String::from_utf8_lossy(logged);

    error!(
        correlation_id = %correlation_id,
        path = %path,
        "Server error occurred - Status: {}, Body: {}",
        parts.status, body_str
    );

    // 重置body以便重新构建响应
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
