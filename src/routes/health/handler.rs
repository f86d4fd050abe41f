use axum::{Json, extract::State};

use crate::{
    AppState,
    health::{HealthReport, ServiceHealth},
};

/// 网关自身状态，存储故障时返回 degraded 而不是错误
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.check().await)
}

#[axum::debug_handler]
pub async fn services(State(state): State<AppState>) -> Json<Vec<ServiceHealth>> {
    Json(state.health.check_services().await)
}
