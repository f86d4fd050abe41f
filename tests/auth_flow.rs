mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header::SET_COOKIE},
};
use common::{INTERNAL_KEY, JWT_SECRET, TestGateway, body_json, config_for, spawn_downstream};
use serde_json::{Value, json};
use session_gateway::utils::{fingerprint, issue_refresh_token, verify_refresh_token};

fn internal(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-internal-request", INTERNAL_KEY);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn gateway() -> TestGateway {
    let auth = spawn_downstream("auth").await;
    TestGateway::new(config_for(&[("auth", &auth.base_url)], &[]))
}

#[tokio::test]
async fn internal_api_requires_the_shared_key() {
    let gateway = gateway().await;
    let payload = json!({ "userId": "u1" }).to_string();

    let missing = gateway
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/internal/sessions")
                .header("content-type", "application/json")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);

    let wrong = gateway
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/internal/sessions")
                .header("x-internal-request", "guess")
                .header("content-type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

    let created = gateway
        .send(internal(Method::POST, "/api/internal/sessions", Some(json!({ "userId": "u1" }))))
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = body_json(created).await;
    let session_id = body["sessionId"].as_str().unwrap();
    assert_eq!(session_id.len(), 43);
    assert_eq!(body["expiresIn"], 604_800);

    let claims = verify_refresh_token(body["refreshToken"].as_str().unwrap(), JWT_SECRET).unwrap();
    assert_eq!(claims.sub, "u1");
    assert_eq!(claims.sid, session_id);
}

#[tokio::test]
async fn internal_create_refuses_invalid_user() {
    let gateway = gateway().await;
    gateway.users.ban("u2");

    let response = gateway
        .send(internal(Method::POST, "/internal/sessions", Some(json!({ "userId": "u2" }))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(gateway.state.sessions.list_sessions("u2").await.unwrap().is_empty());
}

#[tokio::test]
async fn internal_session_lifecycle() {
    let gateway = gateway().await;
    let a = gateway.login("u1").await;
    let b = gateway.login("u1").await;

    let lookup = gateway
        .send(internal(Method::GET, &format!("/internal/sessions/{}", a), None))
        .await;
    assert_eq!(lookup.status(), StatusCode::OK);
    let body = body_json(lookup).await;
    assert_eq!(body["userId"], "u1");
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["isActive"], true);

    let extended = gateway
        .send(internal(Method::POST, &format!("/internal/sessions/{}/extend", a), None))
        .await;
    assert_eq!(extended.status(), StatusCode::OK);
    assert_eq!(body_json(extended).await["sessionId"], a.as_str());

    let listed = gateway
        .send(internal(Method::GET, "/internal/users/u1/sessions", None))
        .await;
    assert_eq!(body_json(listed).await["sessions"].as_array().unwrap().len(), 2);

    let deleted = gateway
        .send(internal(Method::DELETE, &format!("/internal/sessions/{}", a), None))
        .await;
    assert_eq!(body_json(deleted).await["removed"], 1);

    let gone = gateway
        .send(internal(Method::GET, &format!("/internal/sessions/{}", a), None))
        .await;
    assert_eq!(gone.status(), StatusCode::UNAUTHORIZED);

    let revoked = gateway
        .send(internal(Method::DELETE, "/internal/users/u1/sessions", None))
        .await;
    assert_eq!(body_json(revoked).await["removed"], 1);
    assert!(gateway.state.sessions.validate_session(&b).await.is_err());
    assert_eq!(gateway.store.presence("u1"), Some(false));
}

#[tokio::test]
async fn internal_rotate_replaces_session() {
    let gateway = gateway().await;
    let old = gateway.login("u2").await;

    let response = gateway
        .send(internal(
            Method::POST,
            "/internal/sessions/rotate",
            Some(json!({ "sessionId": old })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let new = body_json(response).await["sessionId"].as_str().unwrap().to_string();

    assert_ne!(new, old);
    assert!(gateway.state.sessions.validate_session(&old).await.is_err());
    assert_eq!(
        gateway.state.sessions.validate_session(&new).await.unwrap().session.user_id,
        "u2"
    );
}

#[tokio::test]
async fn bulk_validate_reports_each_user() {
    let gateway = gateway().await;
    gateway.users.ban("u2");
    gateway.users.fail_lookups_for("u9");

    let response = gateway
        .send(internal(
            Method::POST,
            "/internal/users/validate",
            Some(json!({ "userIds": ["u1", "u2", "ghost", "u9"] })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let results = &body_json(response).await["results"];
    assert_eq!(results["u1"], true);
    assert_eq!(results["u2"], false);
    assert_eq!(results["ghost"], false);
    assert!(results.get("u9").is_none());
}

#[tokio::test]
async fn refresh_rotates_session_and_sets_cookie() {
    let gateway = gateway().await;
    let old = gateway.login("u1").await;
    let client_fp = fingerprint("203.0.113.7", "test-agent/1.0");
    let token = issue_refresh_token("u1", &old, Some(&client_fp), 3600, JWT_SECRET).unwrap();

    let response = gateway
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/refresh")
                .header("cookie", format!("refreshToken={}", token))
                .header("x-real-ip", "203.0.113.7")
                .header("user-agent", "test-agent/1.0")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("refreshToken="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    let body = body_json(response).await;
    let new = body["sessionId"].as_str().unwrap();
    assert_ne!(new, old);

    let claims = verify_refresh_token(body["refreshToken"].as_str().unwrap(), JWT_SECRET).unwrap();
    assert_eq!(claims.sid, new);
    assert_eq!(claims.fp.as_deref(), Some(client_fp.as_str()));

    assert!(gateway.state.sessions.validate_session(&old).await.is_err());
    assert!(gateway.state.sessions.validate_session(new).await.is_ok());
}

#[tokio::test]
async fn refresh_tolerates_fingerprint_change() {
    let gateway = gateway().await;
    let old = gateway.login("u1").await;
    let token = issue_refresh_token("u1", &old, Some("stale"), 3600, JWT_SECRET).unwrap();

    let response = gateway
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/refresh")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_requires_a_signed_token_for_the_session_owner() {
    let gateway = gateway().await;
    let old = gateway.login("u1").await;

    let opaque = gateway
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/refresh")
                .header("x-session-id", old.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(opaque.status(), StatusCode::UNAUTHORIZED);

    let stolen = issue_refresh_token("u2", &old, None, 3600, JWT_SECRET).unwrap();
    let mismatched = gateway
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/refresh")
                .header("cookie", format!("refreshToken={}", stolen))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(mismatched.status(), StatusCode::UNAUTHORIZED);

    let foreign = issue_refresh_token("u1", &old, None, 3600, "another-secret").unwrap();
    let forged = gateway
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/refresh")
                .header("cookie", format!("refreshToken={}", foreign))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

    // 失败的刷新不影响原会话
    assert!(gateway.state.sessions.validate_session(&old).await.is_ok());
}

#[tokio::test]
async fn logout_invalidates_session_and_clears_cookies() {
    let gateway = gateway().await;
    let session_id = gateway.login("u1").await;

    let response = gateway
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/logout")
                .header("cookie", format!("session_id={}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cleared: Vec<String> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().any(|c| c.starts_with("refreshToken=;")));
    assert!(cleared.iter().any(|c| c.starts_with("session_id=;")));
    assert_eq!(body_json(response).await["loggedOut"], true);

    assert!(gateway.state.sessions.validate_session(&session_id).await.is_err());
    assert_eq!(gateway.store.presence("u1"), Some(false));
}

#[tokio::test]
async fn logout_without_session_is_unauthorized() {
    let gateway = gateway().await;
    let response = gateway
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_internal_body_uses_error_envelope() {
    let gateway = gateway().await;

    let not_json = gateway
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/internal/sessions")
                .header("x-internal-request", INTERNAL_KEY)
                .body(Body::from("userId=u1"))
                .unwrap(),
        )
        .await;
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
    let body = body_json(not_json).await;
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["message"], "Bad Request");

    let missing_field = gateway
        .send(internal(Method::POST, "/internal/users/validate", Some(json!({ "ids": [] }))))
        .await;
    assert_eq!(missing_field.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing_field).await["statusCode"], 400);
}
