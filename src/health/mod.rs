// 健康检查模块
// 网关自身状态（会话存储）与下游服务探测

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::cache::{SessionStats, SessionStore};
use crate::config::{ServiceRegistry, ServiceRoute};
use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: OverallStatus,
    pub timestamp: String,
    pub session_store: ComponentHealth,
    pub sessions: SessionStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

/// 单个下游服务的探测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub service: String,
    pub status: ServiceStatus,
    /// 毫秒
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 健康状态聚合
///
/// 只读：不修改会话，不参与鉴权。
#[derive(Clone)]
pub struct HealthAggregator {
    store: Arc<dyn SessionStore>,
    registry: ServiceRegistry,
    client: reqwest::Client,
}

impl HealthAggregator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: ServiceRegistry,
        probe_timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(probe_timeout)
            .connect_timeout(probe_timeout)
            .no_proxy()
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build probe client: {}", e)))?;

        Ok(Self {
            store,
            registry,
            client,
        })
    }

    /// 网关自身状态：存储可达为 ok，否则 degraded
    pub async fn check(&self) -> HealthReport {
        let (status, store_status, sessions) = match self.store.ping().await {
            Ok(()) => {
                let sessions = self.store.stats().await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Failed to collect session stats");
                    SessionStats::default()
                });
                (OverallStatus::Ok, ComponentStatus::Connected, sessions)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session store health check failed");
                (
                    OverallStatus::Degraded,
                    ComponentStatus::Disconnected,
                    SessionStats::default(),
                )
            }
        };

        HealthReport {
            status,
            timestamp: Utc::now().to_rfc3339(),
            session_store: ComponentHealth {
                status: store_status,
            },
            sessions,
        }
    }

    /// 并发探测所有已注册服务的 `GET {base_url}/health`
    pub async fn check_services(&self) -> Vec<ServiceHealth> {
        join_all(self.registry.iter().map(|route| self.probe(route))).await
    }

    async fn probe(&self, route: &ServiceRoute) -> ServiceHealth {
        let url = format!("{}/health", route.base_url);
        let started = Instant::now();

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => ServiceHealth {
                service: route.logical_name.clone(),
                status: ServiceStatus::Healthy,
                response_time: Some(started.elapsed().as_millis() as u64),
                error: None,
            },
            Ok(response) => ServiceHealth {
                service: route.logical_name.clone(),
                status: ServiceStatus::Unhealthy,
                response_time: None,
                error: Some(format!("unexpected status {}", response.status().as_u16())),
            },
            Err(e) => {
                tracing::warn!(service = %route.logical_name, error = %e, "Service health probe failed");
                let error = if e.is_timeout() {
                    "timeout".to_string()
                } else if e.is_connect() {
                    "connection failed".to_string()
                } else {
                    e.to_string()
                };
                ServiceHealth {
                    service: route.logical_name.clone(),
                    status: ServiceStatus::Unhealthy,
                    response_time: None,
                    error: Some(error),
                }
            }
        }
    }
}
