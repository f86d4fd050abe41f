use axum::{
    Json,
    extract::{Extension, State},
    http::{HeaderMap, HeaderValue, header::SET_COOKIE},
    response::IntoResponse,
};

use crate::{
    AppState,
    error::{GatewayError, GatewayResult},
    middleware::{Identity, REFRESH_COOKIE, SESSION_COOKIE, StrictIdentity},
    utils::issue_refresh_token,
};

use super::model::{LogoutResponse, SessionTokenResponse};

fn cookie_attributes(secure: bool) -> &'static str {
    if secure {
        "HttpOnly; Secure; SameSite=Strict; Path=/"
    } else {
        "HttpOnly; SameSite=Strict; Path=/"
    }
}

fn set_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> GatewayResult<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Max-Age={}; {}",
        name,
        value,
        max_age,
        cookie_attributes(secure)
    ))
    .map_err(|e| GatewayError::Internal(format!("invalid cookie value: {}", e)))
}

fn clear_cookie(name: &str, secure: bool) -> GatewayResult<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {}",
        name,
        cookie_attributes(secure)
    ))
    .map_err(|e| GatewayError::Internal(format!("invalid cookie value: {}", e)))
}

/// 刷新：轮换会话并签发绑定当前指纹的新刷新令牌
#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    Extension(strict): Extension<StrictIdentity>,
) -> GatewayResult<impl IntoResponse> {
    let rotated = state
        .sessions
        .rotate_session(&strict.identity.session_id)
        .await?;

    let ttl_secs = state.sessions.ttl().as_secs();
    let refresh_token = issue_refresh_token(
        &rotated.session.user_id,
        &rotated.session.session_id,
        Some(&strict.fingerprint),
        ttl_secs,
        &state.config.jwt_secret,
    )?;

    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        set_cookie(REFRESH_COOKIE, &refresh_token, ttl_secs, state.config.cookie_secure)?,
    );

    Ok((
        headers,
        Json(SessionTokenResponse {
            session_id: rotated.session.session_id,
            refresh_token,
            expires_in: ttl_secs,
        }),
    ))
}

/// 登出：删除当前会话并清除两种会话 cookie
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> GatewayResult<impl IntoResponse> {
    let logged_out = state.sessions.invalidate_session(&identity.session_id).await?;

    let secure = state.config.cookie_secure;
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, clear_cookie(REFRESH_COOKIE, secure)?);
    headers.append(SET_COOKIE, clear_cookie(SESSION_COOKIE, secure)?);

    Ok((headers, Json(LogoutResponse { logged_out })))
}
