use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request, header::USER_AGENT},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    extract::CookieJar,
    headers::{Authorization, HeaderMapExt, authorization::Bearer},
};

use super::correlation::CorrelationId;
use crate::{
    AppState,
    config::{Config, matches_prefix},
    dispatch::headers::{
        HEADER_INTERNAL_REQUEST, HEADER_SESSION_ID, HEADER_USER_ID, HEADER_USER_ROLE,
        strip_trust_headers,
    },
    error::{GatewayError, GatewayResult},
    session::ValidatedSession,
    utils::{
        RefreshClaims, client_ip, fingerprint, looks_like_signed_token, short_id,
        verify_refresh_token,
    },
};

pub const REFRESH_COOKIE: &str = "refreshToken";
pub const SESSION_COOKIE: &str = "session_id";

/// 网关内部接口的路径前缀
pub const INTERNAL_PREFIX: &str = "/internal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Internal,
    Protected,
}

/// 按白名单给路径分类，裸路径和带 API 前缀的路径等价
pub fn classify(config: &Config, path: &str) -> RouteClass {
    let path = config.strip_api_prefix(path);
    if matches_prefix(path, INTERNAL_PREFIX) {
        RouteClass::Internal
    } else if config
        .public_routes
        .iter()
        .any(|route| matches_prefix(path, route))
    {
        RouteClass::Public
    } else {
        RouteClass::Protected
    }
}

/// 凭证提取顺序：refreshToken cookie -> Bearer -> session_id cookie -> x-session-id
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    let cookie = |name: &str| {
        jar.get(name)
            .map(|c| c.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    cookie(REFRESH_COOKIE)
        .or_else(|| {
            headers
                .typed_get::<Authorization<Bearer>>()
                .map(|auth| auth.token().trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .or_else(|| cookie(SESSION_COOKIE))
        .or_else(|| {
            headers
                .get(HEADER_SESSION_ID)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
}

/// 签名令牌先验签，取其中的 sid；不透明凭证直接当作会话 ID
pub fn resolve_session_id(
    credential: &str,
    secret: &str,
) -> GatewayResult<(String, Option<RefreshClaims>)> {
    if looks_like_signed_token(credential) {
        let claims = verify_refresh_token(credential, secret)?;
        Ok((claims.sid.clone(), Some(claims)))
    } else {
        Ok((credential.to_string(), None))
    }
}

/// 注入到请求上下文的身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub session_id: String,
    pub role: String,
    pub email: String,
    pub username: String,
}

impl From<ValidatedSession> for Identity {
    fn from(validated: ValidatedSession) -> Self {
        Self {
            user_id: validated.session.user_id,
            session_id: validated.session.session_id,
            role: validated.user.role,
            email: validated.user.email,
            username: validated.user.username,
        }
    }
}

/// 严格校验的结果，只在刷新接口上存在
#[derive(Debug, Clone)]
pub struct StrictIdentity {
    pub identity: Identity,
    pub claims: RefreshClaims,
    pub fingerprint: String,
    pub fingerprint_mismatch: bool,
}

/// 会话层剥离下来的内部调用凭证
#[derive(Debug, Clone)]
pub struct InternalCredential(Option<HeaderValue>);

async fn authenticate(
    state: &AppState,
    credential: &str,
) -> GatewayResult<(Identity, Option<RefreshClaims>)> {
    // 签名失败时不访问存储
    let (session_id, claims) = resolve_session_id(credential, &state.config.jwt_secret)?;
    let validated = state.sessions.validate_session(&session_id).await?;

    if let Some(claims) = &claims {
        if claims.sub != validated.session.user_id {
            return Err(GatewayError::TokenInvalid(
                "token subject does not own the session".into(),
            ));
        }
    }

    Ok((Identity::from(validated), claims))
}

fn apply_trust_headers(headers: &mut HeaderMap, identity: &Identity) {
    let pairs = [
        (HEADER_USER_ID, identity.user_id.as_str()),
        (HEADER_USER_ROLE, identity.role.as_str()),
        (HEADER_SESSION_ID, identity.session_id.as_str()),
    ];
    for (name, value) in pairs {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(name), value);
            }
            Err(_) => {
                headers.remove(name);
                tracing::warn!(header = name, "Identity value is not a valid header value");
            }
        }
    }
}

fn correlation_of(req: &Request<Body>) -> String {
    req.extensions()
        .get::<CorrelationId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

fn reject(correlation_id: &str, path: &str, err: GatewayError) -> Response {
    tracing::warn!(
        correlation_id = %correlation_id,
        path = %path,
        kind = err.kind(),
        error = %err,
        "Request rejected at boundary"
    );
    err.into_response()
}

/// 标准守卫：公开路由放行，受保护路由必须持有有效会话
pub async fn session_guard(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let class = classify(&state.config, &path);

    let internal_key = req.headers_mut().remove(HEADER_INTERNAL_REQUEST);
    strip_trust_headers(req.headers_mut());

    match class {
        RouteClass::Internal => {
            req.extensions_mut().insert(InternalCredential(internal_key));
            next.run(req).await
        }
        RouteClass::Public => next.run(req).await,
        RouteClass::Protected => {
            let correlation_id = correlation_of(&req);
            let credential = match extract_credential(req.headers()) {
                Some(credential) => credential,
                None => return reject(&correlation_id, &path, GatewayError::MissingCredential),
            };

            match authenticate(&state, &credential).await {
                Ok((identity, _)) => {
                    tracing::debug!(
                        correlation_id = %correlation_id,
                        user_id = %identity.user_id,
                        session = short_id(&identity.session_id),
                        "Session validated"
                    );
                    apply_trust_headers(req.headers_mut(), &identity);
                    req.extensions_mut().insert(identity);
                    next.run(req).await
                }
                Err(e) => reject(&correlation_id, &path, e),
            }
        }
    }
}

/// 严格守卫：凭证必须是签名令牌，并计算软指纹（不匹配只记录，不拒绝）
pub async fn strict_guard(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let correlation_id = correlation_of(&req);

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();
    let current_fingerprint = fingerprint(&client_ip(req.headers(), peer), &user_agent);

    let credential = match extract_credential(req.headers()) {
        Some(credential) if looks_like_signed_token(&credential) => credential,
        Some(_) => {
            let err = GatewayError::TokenInvalid("credential is not a signed token".into());
            return reject(&correlation_id, &path, err);
        }
        None => return reject(&correlation_id, &path, GatewayError::MissingCredential),
    };

    let (identity, claims) = match authenticate(&state, &credential).await {
        Ok((identity, Some(claims))) => (identity, claims),
        Ok((_, None)) => {
            let err = GatewayError::TokenInvalid("missing token claims".into());
            return reject(&correlation_id, &path, err);
        }
        Err(e) => return reject(&correlation_id, &path, e),
    };

    let fingerprint_mismatch = claims
        .fp
        .as_deref()
        .is_some_and(|expected| expected != current_fingerprint);
    if fingerprint_mismatch {
        tracing::warn!(
            correlation_id = %correlation_id,
            user_id = %identity.user_id,
            session = short_id(&identity.session_id),
            "Client fingerprint changed since token was issued"
        );
    }

    apply_trust_headers(req.headers_mut(), &identity);
    req.extensions_mut().insert(identity.clone());
    req.extensions_mut().insert(StrictIdentity {
        identity,
        claims,
        fingerprint: current_fingerprint,
        fingerprint_mismatch,
    });
    next.run(req).await
}

/// 内部接口守卫：校验 `x-internal-request` 与配置的密钥一致
pub async fn internal_guard(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .extensions()
        .get::<InternalCredential>()
        .and_then(|credential| credential.0.as_ref())
        .and_then(|value| value.to_str().ok());

    let authorized = match (state.config.internal_api_key.as_deref(), presented) {
        (Some(expected), Some(presented)) => expected == presented,
        _ => false,
    };

    if authorized {
        next.run(req).await
    } else {
        let path = req.uri().path().to_string();
        reject(&correlation_of(&req), &path, GatewayError::Forbidden)
    }
}
