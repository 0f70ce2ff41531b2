//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::error_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;

/// 请求体上限：纯文本接口，2MB 足够容纳最大长度的任务原文
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5060,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 构建带中间件的 Router
pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    // CORS 配置 - 允许所有来源的跨域请求
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    create_routes()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(error_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// 创建新的 HTTP 服务器
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// 启动服务器
    pub async fn run(self) -> Result<(), std::io::Error> {
        let router = build_router(self.state.clone());
        let addr = self.config.addr();

        info!("Starting HTTP server on {}", addr);

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = build_router(self.state.clone());
        let addr = self.config.addr();

        info!("Starting HTTP server on {} (with graceful shutdown)", addr);

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::harness;
    use axum::body::{to_bytes, Body};
    use http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[test]
    fn test_server_config() {
        let config = ServerConfig::new("127.0.0.1", 8080);
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(ServerConfig::default().addr(), "0.0.0.0:5060");
    }

    #[tokio::test]
    async fn test_ping() {
        let h = harness().await;
        let router = build_router(Arc::new(h.app_state()));

        let (status, body) = call(&router, Method::GET, "/api/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 10200);
        assert_eq!(body["data"]["provider_available"], true);
    }

    #[tokio::test]
    async fn test_create_task_and_list_sentences() {
        let h = harness().await;
        let router = build_router(Arc::new(h.app_state()));

        let (_, created) = call(
            &router,
            Method::POST,
            "/api/tasks",
            Some(json!({ "content": "这是一段测试文本。用于验证系统功能。" })),
        )
        .await;
        assert_eq!(created["code"], 10200);
        assert_eq!(created["data"]["sentence_count"], 2);

        let task_id = created["data"]["id"].as_str().unwrap().to_string();
        let (_, listed) = call(
            &router,
            Method::GET,
            &format!("/api/tasks/{}/sentences", task_id),
            None,
        )
        .await;
        assert_eq!(listed["code"], 10200);
        let items = listed["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["ordinal"], 0);
        assert_eq!(items[0]["content"], "这是一段测试文本。");
        assert_eq!(items[1]["ordinal"], 1);
    }

    #[tokio::test]
    async fn test_envelope_errors_use_http_200() {
        let h = harness().await;
        let router = build_router(Arc::new(h.app_state()));

        // 空文本
        let blank = Some(json!({ "content": "  " }));
        let (status, body) = call(&router, Method::POST, "/api/tasks", blank).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 10400);

        // 非法 UUID
        let (status, body) = call(&router, Method::GET, "/api/tasks/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 10400);

        // 不存在的任务
        let uri = format!("/api/tasks/{}", uuid::Uuid::new_v4());
        let (status, body) = call(&router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 10404);

        // 未合成的句子不能合并
        let content = Some(json!({ "content": "一句话。" }));
        let (_, created) = call(&router, Method::POST, "/api/tasks", content).await;
        let task_id = created["data"]["id"].as_str().unwrap().to_string();
        let sentences_uri = format!("/api/tasks/{}/sentences", task_id);
        let (_, listed) = call(&router, Method::GET, &sentences_uri, None).await;
        let sentence_id = listed["data"]["items"][0]["id"].as_str().unwrap().to_string();
        let (_, body) = call(
            &router,
            Method::POST,
            &format!("/api/tasks/{}/merges", task_id),
            Some(json!({ "sentence_ids": [sentence_id] })),
        )
        .await;
        assert_eq!(body["code"], 10409);
    }

    #[tokio::test]
    async fn test_breaking_standards() {
        let h = harness().await;
        let router = build_router(Arc::new(h.app_state()));

        let (_, body) = call(&router, Method::GET, "/api/breaking-standards", None).await;
        let standards = body["data"].as_array().unwrap();
        assert_eq!(standards.len(), 3);
        assert_eq!(standards[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_reading_rule_routes() {
        let h = harness().await;
        let router = build_router(Arc::new(h.app_state()));

        let (_, created) = call(
            &router,
            Method::POST,
            "/api/reading-rules",
            Some(json!({
                "scope": "global",
                "rule_type": "proper_noun",
                "pattern": "AI",
                "rule_value": "人工智能"
            })),
        )
        .await;
        assert_eq!(created["code"], 10200);
        let rule_id = created["data"]["id"].as_str().unwrap().to_string();

        let (_, matched) = call(
            &router,
            Method::POST,
            "/api/reading-rules/match",
            Some(json!({ "text": "AI 改变世界" })),
        )
        .await;
        assert_eq!(matched["code"], 10200);
        assert_eq!(matched["data"].as_array().unwrap().len(), 1);

        let (_, deleted) = call(
            &router,
            Method::DELETE,
            &format!("/api/reading-rules/{}", rule_id),
            None,
        )
        .await;
        assert_eq!(deleted["code"], 10200);

        let (_, listed) = call(&router, Method::GET, "/api/reading-rules", None).await;
        assert!(listed["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_voices() {
        let h = harness().await;
        let router = build_router(Arc::new(h.app_state()));

        let (_, body) = call(&router, Method::GET, "/api/voices", None).await;
        assert_eq!(body["code"], 10200);
        let voices = body["data"].as_array().unwrap();
        assert_eq!(voices.len(), 4);
        assert_eq!(voices[0]["voice_id"], "narrator-female");
        assert_eq!(voices[0]["sort_order"], 1);

        let uri = "/api/voices?recommended=true&language=zh-CN";
        let (_, body) = call(&router, Method::GET, uri, None).await;
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["voice_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["narrator-female", "narrator-male"]);
    }

    #[tokio::test]
    async fn test_rule_setting_route() {
        let h = harness().await;
        let router = build_router(Arc::new(h.app_state()));
        let task = h.create_task("AI 改变世界。").await;

        let (_, created) = call(
            &router,
            Method::POST,
            "/api/reading-rules",
            Some(json!({
                "scope": "global",
                "rule_type": "proper_noun",
                "pattern": "AI",
                "rule_value": "人工智能"
            })),
        )
        .await;
        let rule_id = created["data"]["id"].as_str().unwrap().to_string();

        let (_, body) = call(
            &router,
            Method::POST,
            &format!("/api/reading-rules/{}/settings", rule_id),
            Some(json!({ "task_id": task.id, "enabled": false })),
        )
        .await;
        assert_eq!(body["code"], 10200);
        assert_eq!(body["data"]["enabled"], false);
        assert!(body["data"]["sentence_id"].is_null());

        let uri = format!("/api/reading-rules?task_id={}", task.id);
        let (_, listed) = call(&router, Method::GET, &uri, None).await;
        assert_eq!(listed["data"][0]["enabled"], false);

        // 停用后不再命中
        let (_, matched) = call(
            &router,
            Method::POST,
            "/api/reading-rules/match",
            Some(json!({ "text": "AI 改变世界", "task_id": task.id })),
        )
        .await;
        assert!(matched["data"].as_array().unwrap().is_empty());

        let (_, missing) = call(
            &router,
            Method::POST,
            &format!("/api/reading-rules/{}/settings", uuid::Uuid::new_v4()),
            Some(json!({ "task_id": task.id, "enabled": false })),
        )
        .await;
        assert_eq!(missing["code"], 10404);
    }
}
