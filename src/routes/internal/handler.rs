use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use crate::{
    AppState,
    error::{GatewayError, GatewayResult},
    routes::auth::SessionTokenResponse,
    session::ValidatedSession,
    utils::issue_refresh_token,
};

use super::model::{
    BulkValidateRequest, BulkValidateResponse, CreateSessionRequest, ExtendSessionResponse,
    RemovedResponse, RotateSessionRequest, SessionLookupResponse, UserSessionsResponse,
};

fn token_response(state: &AppState, user_id: &str, session_id: String) -> GatewayResult<SessionTokenResponse> {
    let ttl_secs = state.sessions.ttl().as_secs();
    let refresh_token = issue_refresh_token(
        user_id,
        &session_id,
        None,
        ttl_secs,
        &state.config.jwt_secret,
    )?;
    Ok(SessionTokenResponse {
        session_id,
        refresh_token,
        expires_in: ttl_secs,
    })
}

fn require(value: &str, field: &str) -> GatewayResult<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

/// 登录成功后由认证服务调用
#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateSessionRequest>, GatewayError>,
) -> GatewayResult<impl IntoResponse> {
    require(&req.user_id, "userId")?;

    let session = state.sessions.create_session(&req.user_id).await?;
    let body = token_response(&state, &session.user_id, session.session_id)?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[axum::debug_handler]
pub async fn rotate_session(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RotateSessionRequest>, GatewayError>,
) -> GatewayResult<Json<SessionTokenResponse>> {
    require(&req.session_id, "sessionId")?;

    let ValidatedSession { session, .. } = state.sessions.rotate_session(&req.session_id).await?;
    Ok(Json(token_response(&state, &session.user_id, session.session_id)?))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> GatewayResult<Json<SessionLookupResponse>> {
    let validated = state.sessions.validate_session(&session_id).await?;
    Ok(Json(SessionLookupResponse {
        user_id: validated.session.user_id,
        user: validated.user,
    }))
}

#[axum::debug_handler]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> GatewayResult<Json<RemovedResponse>> {
    let removed = state.sessions.invalidate_session(&session_id).await?;
    Ok(Json(RemovedResponse {
        removed: usize::from(removed),
    }))
}

/// 心跳：只延长 TTL
#[axum::debug_handler]
pub async fn extend_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> GatewayResult<Json<ExtendSessionResponse>> {
    state.sessions.extend_session(&session_id).await?;
    Ok(Json(ExtendSessionResponse {
        session_id,
        expires_in: state.sessions.ttl().as_secs(),
    }))
}

#[axum::debug_handler]
pub async fn list_user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> GatewayResult<Json<UserSessionsResponse>> {
    let sessions = state.sessions.list_sessions(&user_id).await?;
    Ok(Json(UserSessionsResponse { sessions }))
}

/// 强制下线：删除用户的全部会话
#[axum::debug_handler]
pub async fn revoke_user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> GatewayResult<Json<RemovedResponse>> {
    let removed = state.sessions.invalidate_all_for_user(&user_id).await?;
    Ok(Json(RemovedResponse { removed }))
}

#[axum::debug_handler]
pub async fn validate_users(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<BulkValidateRequest>, GatewayError>,
) -> Json<BulkValidateResponse> {
    let results = state.sessions.oracle().bulk_validate(&req.user_ids).await;
    Json(BulkValidateResponse { results })
}
