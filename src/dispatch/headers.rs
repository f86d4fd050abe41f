use axum::http::{
    HeaderMap, HeaderName,
    header::{CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH, HOST, TRANSFER_ENCODING},
};

pub const HEADER_CORRELATION_ID: &str = "x-correlation-id";
pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USER_ROLE: &str = "x-user-role";
pub const HEADER_SESSION_ID: &str = "x-session-id";
pub const HEADER_INTERNAL_REQUEST: &str = "x-internal-request";

/// 转发时丢弃的请求头
pub const REQUEST_BLOCKLIST: [HeaderName; 4] = [HOST, CONTENT_LENGTH, CONTENT_ENCODING, CONNECTION];

/// 回传响应时额外丢弃 transfer-encoding（网关会重新分帧）
pub const RESPONSE_BLOCKLIST: [HeaderName; 5] = [
    HOST,
    CONTENT_LENGTH,
    CONTENT_ENCODING,
    CONNECTION,
    TRANSFER_ENCODING,
];

/// 客户端不能自带的信任头，由网关统一写入
pub const TRUST_HEADERS: [&str; 3] = [HEADER_USER_ID, HEADER_USER_ROLE, HEADER_INTERNAL_REQUEST];

fn filter(headers: &HeaderMap, blocklist: &[HeaderName]) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if !blocklist.contains(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

pub fn sanitize_request_headers(headers: &HeaderMap) -> HeaderMap {
    filter(headers, &REQUEST_BLOCKLIST)
}

pub fn sanitize_response_headers(headers: &HeaderMap) -> HeaderMap {
    filter(headers, &RESPONSE_BLOCKLIST)
}

/// 删除客户端伪造的信任头
pub fn strip_trust_headers(headers: &mut HeaderMap) {
    for name in TRUST_HEADERS {
        headers.remove(name);
    }
}
