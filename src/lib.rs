use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower::ServiceBuilder;

use cache::SessionStore;
use config::Config;
use database::UserRepository;
use dispatch::RequestDispatcher;
use error::GatewayResult;
use health::HealthAggregator;
use session::{SessionService, UserValidityOracle};

pub mod cache;
pub mod config;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionService,
    pub dispatcher: RequestDispatcher,
    pub health: HealthAggregator,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        users: Arc<dyn UserRepository>,
    ) -> GatewayResult<Self> {
        let sessions = SessionService::new(
            store.clone(),
            UserValidityOracle::new(users),
            config.session_ttl(),
        );
        let dispatcher = RequestDispatcher::new(config.services.clone(), config.request_timeout())?;
        let health = HealthAggregator::new(store, config.services.clone(), config.health_probe_timeout())?;

        Ok(Self {
            config: Arc::new(config),
            sessions,
            dispatcher,
            health,
        })
    }
}

/// 网关本地路由（裸路径和 API 前缀下各挂一份）
fn local_routes(state: &AppState) -> Router<AppState> {
    let auth_routes = Router::new()
        .route(
            "/auth/refresh",
            post(routes::auth::refresh).route_layer(from_fn_with_state(
                state.clone(),
                middleware::strict_guard,
            )),
        )
        .route("/auth/logout", post(routes::auth::logout));

    let internal_routes = Router::new()
        .route("/internal/sessions", post(routes::internal::create_session))
        .route(
            "/internal/sessions/rotate",
            post(routes::internal::rotate_session),
        )
        .route(
            "/internal/sessions/{id}",
            get(routes::internal::get_session).delete(routes::internal::delete_session),
        )
        .route(
            "/internal/sessions/{id}/extend",
            post(routes::internal::extend_session),
        )
        .route(
            "/internal/users/{user_id}/sessions",
            get(routes::internal::list_user_sessions)
                .delete(routes::internal::revoke_user_sessions),
        )
        .route(
            "/internal/users/validate",
            post(routes::internal::validate_users),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::internal_guard));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/health/services", get(routes::health::services))
        .merge(auth_routes)
        .merge(internal_routes)
}

/// 组装完整的网关路由
///
/// 中间件从外到内：关联 ID -> 5xx 日志 -> 会话守卫。
/// 未命中本地路由的请求由转发处理器兜底。
pub fn build_router(state: AppState) -> Router {
    let local = local_routes(&state);

    let mut router = Router::new().merge(local.clone());
    let prefix = state.config.api_prefix.trim_end_matches('/');
    if !prefix.is_empty() {
        router = router.nest(prefix, local);
    }

    router
        .fallback(routes::proxy::forward)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(middleware::correlation_id))
                .layer(from_fn(middleware::log_errors))
                .layer(from_fn_with_state(state.clone(), middleware::session_guard)),
        )
        .with_state(state)
}
