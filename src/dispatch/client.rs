use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode},
    response::IntoResponse,
};

use super::headers::{HEADER_CORRELATION_ID, sanitize_request_headers, sanitize_response_headers};
use crate::config::ServiceRegistry;
use crate::error::{GatewayError, GatewayResult};

/// 一次转发调用的请求
#[derive(Debug, Clone)]
pub struct ForwardedRequest {
    pub method: Method,
    /// 路径（含查询串），以 `/` 开头
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub correlation_id: String,
}

/// 下游响应，原样回传
#[derive(Debug)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// 响应扩展：标记这是下游回传的响应，中间件不得改写其内容
#[derive(Debug, Clone, Copy)]
pub struct Relayed;

impl IntoResponse for ForwardedResponse {
    fn into_response(self) -> axum::response::Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response.extensions_mut().insert(Relayed);
        response
    }
}

/// 请求转发器
///
/// 固定超时、不自动重试：转发的操作不保证幂等，失败立即返回给调用方。
/// 下游的 4xx/5xx 是正常响应，只有连接级失败才变成 `ServiceUnavailable`。
#[derive(Clone)]
pub struct RequestDispatcher {
    client: reqwest::Client,
    registry: Arc<ServiceRegistry>,
}

impl RequestDispatcher {
    pub fn new(registry: ServiceRegistry, timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .no_proxy()
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            registry: Arc::new(registry),
        })
    }

    pub async fn forward(
        &self,
        service_name: &str,
        request: ForwardedRequest,
    ) -> GatewayResult<ForwardedResponse> {
        let route = self
            .registry
            .resolve(service_name)
            .ok_or_else(|| GatewayError::ServiceUnknown(service_name.to_string()))?;
        let target_url = format!("{}{}", route.base_url, request.path);

        let mut headers = sanitize_request_headers(&request.headers);
        if let Ok(value) = HeaderValue::from_str(&request.correlation_id) {
            headers.insert(HeaderName::from_static(HEADER_CORRELATION_ID), value);
        }

        let mut outbound = self
            .client
            .request(request.method.clone(), &target_url)
            .headers(headers);
        if !request.body.is_empty() {
            outbound = outbound.body(request.body);
        }

        let started = Instant::now();
        let result = async {
            let response = outbound.send().await?;
            let status = response.status();
            let headers = sanitize_response_headers(response.headers());
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(ForwardedResponse {
                status,
                headers,
                body,
            })
        }
        .await;

        match result {
            Ok(response) => {
                tracing::debug!(
                    correlation_id = %request.correlation_id,
                    service = service_name,
                    method = %request.method,
                    path = %request.path,
                    status = response.status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Forwarded request"
                );
                Ok(response)
            }
            Err(e) if !is_connection_level(&e) => {
                tracing::error!(
                    correlation_id = %request.correlation_id,
                    service = service_name,
                    path = %request.path,
                    error = %e,
                    "Failed to build request to service"
                );
                Err(GatewayError::Internal(format!("failed to build request: {}", e)))
            }
            Err(e) => {
                let reason = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "connection lost"
                };
                tracing::error!(
                    correlation_id = %request.correlation_id,
                    service = service_name,
                    service_url = %route.base_url,
                    path = %request.path,
                    reason,
                    error = %e,
                    "Failed to forward request to service"
                );
                Err(GatewayError::ServiceUnavailable {
                    service: service_name.to_string(),
                    reason: reason.to_string(),
                })
            }
        }
    }
}

/// 构造阶段的错误（非法 URL、非法头等）不算下游不可用；
/// 发送后的错误（包括读取响应体时连接中断）都算连接级失败
fn is_connection_level(e: &reqwest::Error) -> bool {
    !e.is_builder()
}
