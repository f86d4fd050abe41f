use std::collections::BTreeMap;

use super::ConfigError;

/// 逻辑服务名到地址的映射项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoute {
    pub logical_name: String,
    pub base_url: String,
}

/// 静态服务注册表，运行期只读
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, ServiceRoute>,
}

impl ServiceRegistry {
    pub fn new<I, N, U>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: Into<String>,
    {
        let services = entries
            .into_iter()
            .map(|(name, url)| {
                let logical_name = name.into();
                let base_url = url.into().trim_end_matches('/').to_string();
                (
                    logical_name.clone(),
                    ServiceRoute {
                        logical_name,
                        base_url,
                    },
                )
            })
            .collect();
        Self { services }
    }

    /// 解析 `auth=http://auth:3001,user=http://user:3002`
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, url) = pair
                .split_once('=')
                .ok_or_else(|| ConfigError::Malformed("SERVICE_URLS", pair.to_string()))?;
            let (name, url) = (name.trim(), url.trim());
            if name.is_empty() || !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Malformed("SERVICE_URLS", pair.to_string()));
            }
            entries.push((name.to_string(), url.to_string()));
        }
        Ok(Self::new(entries))
    }

    pub fn resolve(&self, name: &str) -> Option<&ServiceRoute> {
        self.services.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceRoute> {
        self.services.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

/// 路径前缀到逻辑服务名的路由表，最长前缀优先
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<(String, String)>,
}

impl RouteTable {
    pub fn new<I, P, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, N)>,
        P: Into<String>,
        N: Into<String>,
    {
        let mut entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(prefix, name)| (normalize_prefix(&prefix.into()), name.into()))
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        entries.dedup_by(|a, b| a.0 == b.0);
        Self { entries }
    }

    /// 每个服务默认挂在 `/<name>` 下
    pub fn for_registry(registry: &ServiceRegistry) -> Self {
        Self::new(registry.names().map(|name| (format!("/{}", name), name.to_string())))
    }

    /// 解析 `/auth=auth,/comments=post`
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut entries = Vec::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (prefix, name) = pair
                .split_once('=')
                .ok_or_else(|| ConfigError::Malformed("SERVICE_ROUTES", pair.to_string()))?;
            let (prefix, name) = (prefix.trim(), name.trim());
            if !prefix.starts_with('/') || name.is_empty() {
                return Err(ConfigError::Malformed("SERVICE_ROUTES", pair.to_string()));
            }
            entries.push((prefix.to_string(), name.to_string()));
        }
        Ok(Self::new(entries))
    }

    /// 检查每条路由指向的服务都已注册
    pub fn check_against(&self, registry: &ServiceRegistry) -> Result<(), ConfigError> {
        match self.entries.iter().find(|(_, name)| !registry.contains(name)) {
            Some((prefix, name)) => Err(ConfigError::UnknownService {
                prefix: prefix.clone(),
                service: name.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn resolve(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(prefix, _)| matches_prefix(path, prefix))
            .map(|(_, name)| name.as_str())
    }
}

/// 按路径段边界做前缀匹配：`/users` 匹配 `/users/42`，不匹配 `/usersettings`
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
