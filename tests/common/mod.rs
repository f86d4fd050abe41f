#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use session_gateway::{
    AppState, build_router,
    cache::MemorySessionStore,
    config::{Config, RouteTable, ServiceRegistry},
    database::{MemoryUserRepository, UserRecord},
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const INTERNAL_KEY: &str = "integration-internal-key";

/// 下游服务收到的一次请求
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// 回环地址上的假下游服务
pub struct Downstream {
    pub base_url: String,
    hits: Arc<Mutex<Vec<Recorded>>>,
}

impl Downstream {
    pub fn hits(&self) -> Vec<Recorded> {
        self.hits.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.hits().pop().expect("downstream received no request")
    }
}

/// `/slow` 延迟 5 秒，`.../conflict` 返回 409，`.../outage` 返回 503 和一个大响应体，
/// 其余返回 200 并回显路径
pub async fn spawn_downstream(name: &'static str) -> Downstream {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let recorder = hits.clone();

    let app = Router::new().fallback(move |req: Request<Body>| {
        let recorder = recorder.clone();
        async move {
            let (parts, body) = req.into_parts();
            let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
            let uri = parts.uri.to_string();
            recorder.lock().unwrap().push(Recorded {
                method: parts.method.clone(),
                uri: uri.clone(),
                headers: parts.headers.clone(),
                body,
            });

            let path = parts.uri.path();
            if path == "/slow" {
                tokio::time::sleep(Duration::from_secs(5)).await;
                return "late".into_response();
            }
            if path.ends_with("/conflict") {
                return (
                    StatusCode::CONFLICT,
                    [("x-origin", name)],
                    axum::Json(json!({ "error": "duplicate", "service": name })),
                )
                    .into_response();
            }
            if path.ends_with("/outage") {
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    [("x-origin", name), ("retry-after", "30")],
                    outage_body(),
                )
                    .into_response();
            }
            (
                [("x-origin", name)],
                axum::Json(json!({ "service": name, "uri": uri })),
            )
                .into_response()
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Downstream {
        base_url: format!("http://{}", addr),
        hits,
    }
}

/// 下游 `.../outage` 返回的响应体，超过 1 KiB
pub fn outage_body() -> String {
    (0..4096).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
}

/// 一个当前没有监听者的回环地址
pub async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn config_for(services: &[(&str, &str)], routes: &[(&str, &str)]) -> Config {
    let services = ServiceRegistry::new(services.iter().map(|(n, u)| (n.to_string(), u.to_string())));
    let routes = if routes.is_empty() {
        RouteTable::for_registry(&services)
    } else {
        RouteTable::new(routes.iter().map(|(p, n)| (p.to_string(), n.to_string())))
    };
    Config {
        jwt_secret: JWT_SECRET.into(),
        internal_api_key: Some(INTERNAL_KEY.into()),
        cookie_secure: false,
        request_timeout_secs: 1,
        health_probe_timeout_secs: 1,
        services,
        routes,
        ..Config::default()
    }
}

pub struct TestGateway {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemorySessionStore>,
    pub users: Arc<MemoryUserRepository>,
}

impl TestGateway {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(MemorySessionStore::new());
        let users = Arc::new(MemoryUserRepository::with_users([
            UserRecord::active("u1", "alice", "user"),
            UserRecord::active("u2", "bob", "admin"),
        ]));
        let state = AppState::new(config, store.clone(), users.clone()).unwrap();
        Self {
            router: build_router(state.clone()),
            state,
            store,
            users,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// 直接通过会话服务登录，返回会话 ID
    pub async fn login(&self, user_id: &str) -> String {
        self.state
            .sessions
            .create_session(user_id)
            .await
            .unwrap()
            .session_id
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// 收集日志输出，供断言使用
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// 在当前线程上安装日志收集器（配合单线程的 `#[tokio::test]`）
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
