use std::env;
use std::time::Duration;

use thiserror::Error;

mod services;

pub use services::{RouteTable, ServiceRegistry, ServiceRoute, matches_prefix};

/// 会话默认有效期：7 天（滑动过期）
pub const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 3600;

/// 转发请求的固定超时
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_PUBLIC_ROUTES: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/refresh",
    "/auth/forgot-password",
    "/auth/reset-password",
    "/health",
    "/docs",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} has an invalid value: {1}")]
    Malformed(&'static str, String),

    #[error("route '{prefix}' points at unregistered service '{service}'")]
    UnknownService { prefix: String, service: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub session_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub health_probe_timeout_secs: u64,
    pub api_prefix: String,
    pub public_routes: Vec<String>,
    pub services: ServiceRegistry,
    pub routes: RouteTable,
    pub internal_api_key: Option<String>,
    pub cookie_secure: bool,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        let services = ServiceRegistry::new([
            ("auth", "http://localhost:3001"),
            ("user", "http://localhost:3002"),
            ("post", "http://localhost:3003"),
        ]);
        let routes = RouteTable::for_registry(&services);
        Self {
            redis_url: "redis://127.0.0.1:6379".into(),
            database_url: "postgres://localhost/app".into(),
            server_host: "0.0.0.0".into(),
            server_port: 3000,
            jwt_secret: String::new(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            health_probe_timeout_secs: 5,
            api_prefix: "/api".into(),
            public_routes: DEFAULT_PUBLIC_ROUTES.iter().map(|r| r.to_string()).collect(),
            services,
            routes,
            internal_api_key: None,
            cookie_secure: true,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();

        let jwt_secret = env::var("JWT_REFRESH_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_REFRESH_SECRET"))?;

        let services = match env::var("SERVICE_URLS") {
            Ok(raw) => ServiceRegistry::parse(&raw)?,
            Err(_) => defaults.services,
        };
        let routes = match env::var("SERVICE_ROUTES") {
            Ok(raw) => RouteTable::parse(&raw)?,
            Err(_) => RouteTable::for_registry(&services),
        };
        routes.check_against(&services)?;

        let public_routes = match env::var("PUBLIC_ROUTES") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => defaults.public_routes,
        };

        Ok(Config {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
            jwt_secret,
            session_ttl_secs: parse_var("SESSION_TTL", defaults.session_ttl_secs)?,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT", defaults.request_timeout_secs)?,
            health_probe_timeout_secs: parse_var(
                "HEALTH_PROBE_TIMEOUT",
                defaults.health_probe_timeout_secs,
            )?,
            api_prefix: env::var("API_PREFIX")
                .map(|p| p.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_prefix),
            public_routes,
            services,
            routes,
            internal_api_key: env::var("INTERNAL_API_KEY").ok().filter(|k| !k.is_empty()),
            cookie_secure: parse_var("COOKIE_SECURE", defaults.cookie_secure)?,
            max_body_bytes: parse_var("MAX_BODY_BYTES", defaults.max_body_bytes)?,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn health_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.health_probe_timeout_secs)
    }

    /// 去掉 API 前缀，`/api/users/42` -> `/users/42`
    pub fn strip_api_prefix<'a>(&self, path: &'a str) -> &'a str {
        if self.api_prefix.is_empty() || !matches_prefix(path, &self.api_prefix) {
            return path;
        }
        match &path[self.api_prefix.len()..] {
            "" => "/",
            rest => rest,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Malformed(name, raw)),
        Err(_) => Ok(default),
    }
}
