use std::net::SocketAddr;

use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::GatewayError;

/// 会话 ID 的随机字节数（256 bit）
const SESSION_ID_BYTES: usize = 32;

/// 生成不可猜测的会话 ID
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: String, // 用户ID
    pub sid: String, // 会话ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp: Option<String>, // 客户端指纹
    pub iat: i64,
    pub exp: i64,
}

/// 签发刷新令牌，有效期与会话 TTL 一致
pub fn issue_refresh_token(
    user_id: &str,
    session_id: &str,
    fingerprint: Option<&str>,
    ttl_secs: u64,
    secret: &str,
) -> Result<String, GatewayError> {
    let now = Utc::now().timestamp();
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        sid: session_id.to_string(),
        fp: fingerprint.map(str::to_string),
        iat: now,
        exp: now + ttl_secs as i64,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| GatewayError::Internal(format!("failed to sign refresh token: {}", e)))
}

/// 校验签名与过期时间，不访问会话存储
pub fn verify_refresh_token(token: &str, secret: &str) -> Result<RefreshClaims, GatewayError> {
    let token_data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| GatewayError::TokenInvalid(e.to_string()))?;

    Ok(token_data.claims)
}

/// JWT 形式：三段 base64url，以 `.` 分隔
pub fn looks_like_signed_token(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty())
}

/// 软指纹：sha256(ip | user-agent)
pub fn fingerprint(ip: &str, user_agent: &str) -> String {
    let digest = Sha256::digest(format!("{}|{}", ip, user_agent).as_bytes());
    format!("{:x}", digest)
}

/// 客户端 IP：x-real-ip -> x-forwarded-for 第一项 -> 连接地址
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let remote_ip = peer.map(|addr| addr.ip().to_string());
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

/// 日志里只记录会话 ID 前缀
pub fn short_id(id: &str) -> &str {
    let end = id
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(id.len());
    &id[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    #[test]
    fn session_ids_are_long_and_distinct() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_eq!(a.len(), 43); // 32 bytes, base64url without padding
        assert_ne!(a, b);
        assert!(!looks_like_signed_token(&a));
    }

    #[test]
    fn refresh_token_round_trip() {
        let token = issue_refresh_token("u1", "sid-1", Some("fp"), 3600, SECRET).unwrap();
        assert!(looks_like_signed_token(&token));
        let claims = verify_refresh_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.sid, "sid-1");
        assert_eq!(claims.fp.as_deref(), Some("fp"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_with_wrong_secret_is_rejected() {
        let token = issue_refresh_token("u1", "sid-1", None, 3600, SECRET).unwrap();
        let err = verify_refresh_token(&token, "other-secret").unwrap_err();
        assert_eq!(err.kind(), "TokenInvalid");
    }

    #[test]
    fn expired_refresh_token_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: "u1".into(),
            sid: "sid-1".into(),
            fp: None,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            verify_refresh_token(&token, SECRET),
            Err(GatewayError::TokenInvalid(_))
        ));
    }

    #[test]
    fn fingerprint_depends_on_both_parts() {
        let base = fingerprint("10.0.0.1", "curl/8");
        assert_eq!(base, fingerprint("10.0.0.1", "curl/8"));
        assert_ne!(base, fingerprint("10.0.0.2", "curl/8"));
        assert_ne!(base, fingerprint("10.0.0.1", "firefox"));
        assert_eq!(base.len(), 64);
    }

    #[test]
    fn client_ip_prefers_proxy_headers() {
        let peer: SocketAddr = "192.168.1.9:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)), "192.168.1.9");
        assert_eq!(client_ip(&headers, None), "unknown");

        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4, 5.6.7.8"));
        assert_eq!(client_ip(&headers, Some(peer)), "1.2.3.4");

        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(client_ip(&headers, Some(peer)), "9.9.9.9");
    }

    #[test]
    fn short_id_truncates() {
        assert_eq!(short_id("abcdefghijkl"), "abcdefgh");
        assert_eq!(short_id("abc"), "abc");
    }
}
