use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::dispatch::headers::HEADER_CORRELATION_ID;

const MAX_CORRELATION_ID_LEN: usize = 128;

/// 本次请求的关联 ID，存放在请求扩展里
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_acceptable(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_CORRELATION_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic())
}

/// 沿用入站的 `x-correlation-id`，没有或不合法时生成 UUID v4
pub async fn correlation_id(mut req: Request<Body>, next: Next) -> Response {
    let header = HeaderName::from_static(HEADER_CORRELATION_ID);

    let id = req
        .headers()
        .get(&header)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| is_acceptable(v))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // 只含可见 ASCII，构造不会失败
    let value = HeaderValue::from_str(&id).unwrap_or_else(|_| HeaderValue::from_static("invalid"));
    req.headers_mut().insert(header.clone(), value.clone());
    req.extensions_mut().insert(CorrelationId(id));

    let mut response = next.run(req).await;
    response.headers_mut().insert(header, value);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, Router, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|Extension(id): Extension<CorrelationId>| async move { id.0 }),
            )
            .layer(axum::middleware::from_fn(correlation_id))
    }

    #[tokio::test]
    async fn adopts_inbound_id() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header("x-correlation-id", "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get("x-correlation-id").unwrap(), "req-123");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"req-123");
    }

    #[tokio::test]
    async fn generates_id_when_absent_or_oversized() {
        for inbound in [None, Some("x".repeat(200))] {
            let mut builder = Request::builder().uri("/echo");
            if let Some(value) = &inbound {
                builder = builder.header("x-correlation-id", value.as_str());
            }
            let response = app()
                .oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap();
            let id = response
                .headers()
                .get("x-correlation-id")
                .unwrap()
                .to_str()
                .unwrap()
                .to_string();
            assert!(Uuid::parse_str(&id).is_ok());
        }
    }
}
