//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the public router and its middleware stack
//! - Run the admin listener beside it when enabled
//! - Apply hot-reloadable config (upstream catalogue, admin identities)
//! - Drive the usage flusher and the final flushes on shutdown

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminChannel, AdminIdentities, AdminState};
use crate::board::MessageBoard;
use crate::config::GatewayConfig;
use crate::http::handlers::telemetry::TelemetryLog;
use crate::http::handlers::{board, health, keys, stats, telemetry, upstream};
use crate::http::middleware::{
    envelope_rejections, method_not_allowed, require_api_key, track_usage, UsageLayerState,
};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::failure;
use crate::keys::{KeyIssuer, KeyStore, KeyValidator};
use crate::lifecycle::shutdown::{self, Shutdown};
use crate::lifecycle::startup::{open_stores, StartupError};
use crate::upstream::{Catalogue, UpstreamClient};
use crate::usage::{UsageCounters, UsageFlusher};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: KeyIssuer,
    pub validator: KeyValidator,
    pub usage: Arc<UsageCounters>,
    pub catalogue: Arc<ArcSwap<Catalogue>>,
    pub upstream: UpstreamClient,
    pub board: Arc<MessageBoard>,
    pub telemetry: Arc<TelemetryLog>,
}

/// The gateway: public router, admin transport and background tasks.
pub struct HttpServer {
    router: Router,
    state: AppState,
    keys: Arc<KeyStore>,
    identities: Arc<AdminIdentities>,
    config: GatewayConfig,
}

impl HttpServer {
    /// Restore persisted state and build the router.
    pub async fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let stores = open_stores(&config).await?;
        let upstream = UpstreamClient::new(&config.upstream, &config.timeouts)?;

        let catalogue = Catalogue::from_config(&config.upstream.routes);
        tracing::info!(routes = catalogue.len(), "Upstream catalogue loaded");

        let state = AppState {
            issuer: KeyIssuer::new(stores.keys.clone(), config.keys.key_length),
            validator: KeyValidator::new(stores.keys.clone()),
            usage: stores.usage,
            catalogue: Arc::new(ArcSwap::from_pointee(catalogue)),
            upstream,
            board: stores.board,
            telemetry: Arc::new(TelemetryLog::default()),
        };

        let router = Self::build_router(&config, state.clone());
        let identities = Arc::new(AdminIdentities::new(
            config.admin.identities.iter().cloned(),
        ));

        Ok(Self {
            router,
            state,
            keys: stores.keys,
            identities,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request id, trace, usage accounting, panic guard,
    /// rejection envelope, body limit, request timeout. Usage sits outside
    /// everything that can reject a request so every request is counted.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let usage = UsageLayerState {
            counters: state.usage.clone(),
            trust_forwarded_for: config.usage.trust_forwarded_for,
        };

        let protected = Router::new()
            .route("/api/keys/verify", get(keys::verify_key))
            .route_layer(middleware::from_fn_with_state(
                state.validator.clone(),
                require_api_key,
            ));

        Router::new()
            .route("/health", get(health::health))
            .route("/api/keys", get(keys::issue_key))
            .route("/api/statistics", get(stats::statistics))
            .route(
                "/api/battery-level",
                get(telemetry::latest_battery).post(telemetry::report_battery),
            )
            .route(
                "/api/messages",
                get(board::list_messages).post(board::post_message),
            )
            .merge(protected)
            .method_not_allowed_fallback(method_not_allowed)
            .fallback(upstream::proxy)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(middleware::from_fn_with_state(usage, track_usage))
                    .layer(CatchPanicLayer::custom(panic_response))
                    .layer(middleware::from_fn(envelope_rejections))
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// The public router, for serving it elsewhere or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve until `shutdown_rx` fires, then stop background tasks and flush state.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        let addr = listener.local_addr().map_err(|source| StartupError::Bind {
            address: self.config.listener.bind_address.clone(),
            source,
        })?;
        tracing::info!(address = %addr, "HTTP server starting");

        // Background tasks outlive the public listener so they can flush after it drains.
        let background = Shutdown::new();

        let flusher = tokio::spawn(
            UsageFlusher::new(
                self.state.usage.clone(),
                Duration::from_secs(self.config.usage.flush_interval_secs),
            )
            .run(background.subscribe()),
        );

        let admin = if self.config.admin.enabled {
            Some(self.spawn_admin(background.subscribe()).await?)
        } else {
            None
        };

        let reload = tokio::spawn(reload_loop(
            self.config.clone(),
            self.state.catalogue.clone(),
            self.identities.clone(),
            config_updates,
            background.subscribe(),
        ));

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::recv(shutdown_rx))
            .await;
        if let Err(e) = &served {
            tracing::error!(error = %e, "HTTP server error");
        }
        tracing::info!("HTTP server stopped, stopping background tasks");

        background.trigger();
        for (name, task) in [("usage flusher", flusher), ("config reload", reload)] {
            if let Err(e) = task.await {
                tracing::error!(task = name, error = %e, "Background task failed");
            }
        }
        if let Some(task) = admin {
            if let Err(e) = task.await {
                tracing::error!(
                    task = "admin listener",
                    error = %e,
                    "Background task failed"
                );
            }
        }

        if let Err(e) = self.keys.flush().await {
            tracing::error!(error = %e, "Final credential store flush failed");
        }

        tracing::info!("Gateway stopped");
        Ok(())
    }

    async fn spawn_admin(
        &self,
        stop: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, StartupError> {
        let address = self.config.admin.bind_address.clone();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind {
                address: address.clone(),
                source,
            })?;

        let channel = AdminChannel::new(
            self.state.issuer.clone(),
            self.state.usage.clone(),
            self.identities.clone(),
        );
        let router = setup_admin_router(AdminState {
            channel: Arc::new(channel),
            keys: self.keys.clone(),
            usage: self.state.usage.clone(),
            api_key: Arc::from(self.config.admin.api_key.as_str()),
        });

        tracing::info!(
            address = %address,
            identities = self.identities.len(),
            "Admin listener starting"
        );

        Ok(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown::recv(stop))
                .await
            {
                tracing::error!(error = %e, "Admin listener error");
            }
        }))
    }
}

/// Apply reloaded configs until stopped.
///
/// Only the upstream catalogue and admin identities change at runtime; other
/// differences are reported and wait for a restart.
async fn reload_loop(
    mut current: GatewayConfig,
    catalogue: Arc<ArcSwap<Catalogue>>,
    identities: Arc<AdminIdentities>,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut stop: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(next) = update else { break };

                let routes = Catalogue::from_config(&next.upstream.routes);
                tracing::info!(routes = routes.len(), "Upstream catalogue reloaded");
                catalogue.store(Arc::new(routes));
                identities.replace(next.admin.identities.iter().cloned());

                for section in restart_required(&current, &next) {
                    tracing::warn!(
                        section,
                        "Config change requires a restart to take effect"
                    );
                }
                current = next;
            }
            _ = stop.recv() => break,
        }
    }
}

fn restart_required(current: &GatewayConfig, next: &GatewayConfig) -> Vec<&'static str> {
    let mut sections = Vec::new();
    if current.listener.bind_address != next.listener.bind_address
        || current.listener.max_body_size != next.listener.max_body_size
    {
        sections.push("listener");
    }
    if current.keys.store_path != next.keys.store_path
        || current.keys.key_length != next.keys.key_length
    {
        sections.push("keys");
    }
    if current.usage.store_path != next.usage.store_path
        || current.usage.visitor_window_secs != next.usage.visitor_window_secs
        || current.usage.flush_interval_secs != next.usage.flush_interval_secs
    {
        sections.push("usage");
    }
    if current.board.store_path != next.board.store_path {
        sections.push("board");
    }
    if current.admin.enabled != next.admin.enabled
        || current.admin.bind_address != next.admin.bind_address
        || current.admin.api_key != next.admin.api_key
    {
        sections.push("admin");
    }
    sections
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn memory_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.keys.store_path = None;
        config.usage.store_path = None;
        config.board.store_path = None;
        config
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("Content-Type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let res = app.clone().oneshot(request).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_issue_then_reuse() {
        let server = HttpServer::new(memory_config()).await.unwrap();
        let app = server.router();

        let (status, first) = call(&app, "GET", "/api/keys?accountId=alice", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["result"], true);
        assert_eq!(first["message"], "API key created");

        let (status, second) = call(&app, "GET", "/api/keys?accountId=alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["apikey"], first["apikey"]);
        assert_eq!(second["message"], "API key already exists");

        let (status, body) = call(&app, "GET", "/api/keys", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["result"], false);
    }

    #[tokio::test]
    async fn test_verify_status_split() {
        let server = HttpServer::new(memory_config()).await.unwrap();
        let app = server.router();
        let (_, issued) = call(&app, "GET", "/api/keys?accountId=alice", None).await;
        let key = issued["apikey"].as_str().unwrap().to_string();

        let cases = [
            ("/api/keys/verify?apikey=x".to_string(), StatusCode::BAD_REQUEST),
            ("/api/keys/verify?username=alice".to_string(), StatusCode::UNAUTHORIZED),
            (
                "/api/keys/verify?username=alice&apikey=wrong1".to_string(),
                StatusCode::FORBIDDEN,
            ),
            (format!("/api/keys/verify?username=alice&apikey={}", key), StatusCode::OK),
        ];
        for (uri, expected) in cases {
            let (status, body) = call(&app, "GET", &uri, None).await;
            assert_eq!(status, expected, "{}", uri);
            assert_eq!(body["result"], expected == StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_every_request_is_counted() {
        let server = HttpServer::new(memory_config()).await.unwrap();
        let app = server.router();

        call(&app, "GET", "/nowhere", None).await;
        call(&app, "GET", "/api/keys", None).await;
        let (status, stats) = call(&app, "GET", "/api/statistics", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["totalRequests"], 3);
        // No ConnectInfo under oneshot: every request comes from "unknown".
        assert_eq!(stats["totalVisitors"], 1);
    }

    #[tokio::test]
    async fn test_unknown_path_is_enveloped_404() {
        let server = HttpServer::new(memory_config()).await.unwrap();
        let (status, body) = call(&server.router(), "GET", "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["result"], false);
    }

    #[tokio::test]
    async fn test_battery_level() {
        let server = HttpServer::new(memory_config()).await.unwrap();
        let app = server.router();

        let (status, _) = call(&app, "GET", "/api/battery-level", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, "POST", "/api/battery-level", Some("{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing level field");

        let (status, _) = call(&app, "POST", "/api/battery-level", Some("not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let level = Some(r#"{"level": 77}"#);
        let (status, _) = call(&app, "POST", "/api/battery-level", level).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "GET", "/api/battery-level", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["level"], 77.0);
    }

    #[tokio::test]
    async fn test_message_board_routes() {
        let server = HttpServer::new(memory_config()).await.unwrap();
        let app = server.router();

        let empty = Some(r#"{"text": ""}"#);
        let (status, _) = call(&app, "POST", "/api/messages", empty).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) =
            call(&app, "POST", "/api/messages", Some(r#"{"text": "hello"}"#)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["id"].is_string());

        let (status, listing) = call(&app, "GET", "/api/messages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["messages"][0]["text"], "hello");
        assert_eq!(listing["messages"][0]["sender"], "other");
    }

    #[tokio::test]
    async fn test_wrong_method_is_enveloped_405() {
        let server = HttpServer::new(memory_config()).await.unwrap();
        let app = server.router();
        let (status, body) = call(&app, "POST", "/api/keys?accountId=a", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["result"], false);
        assert_eq!(body["message"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_oversized_body_is_enveloped_413() {
        let mut config = memory_config();
        config.listener.max_body_size = 16;
        let server = HttpServer::new(config).await.unwrap();

        let payload = format!(r#"{{"text": "{}"}}"#, "x".repeat(100));
        let request = Request::builder()
            .method("POST")
            .uri("/api/messages")
            .header("Content-Type", "application/json")
            .header("Content-Length", payload.len())
            .body(Body::from(payload))
            .unwrap();
        let res = server.router().oneshot(request).await.unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["result"], false);
        assert_eq!(body["message"], "Request body too large");
        assert!(server.state().board.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_request_deadline_is_enveloped() {
        // Accepts connections and never answers.
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = upstream.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = upstream.accept().await {
                held.push(socket);
            }
        });

        let mut config = memory_config();
        config.timeouts.request_secs = 1;
        config.timeouts.upstream_secs = 5;
        config.upstream.routes.push(
            toml::from_str(&format!(
                "path = \"/api/slow\"\ntarget = \"http://{}/slow\"",
                addr
            ))
            .unwrap(),
        );
        let server = HttpServer::new(config).await.unwrap();

        let (status, body) = call(&server.router(), "GET", "/api/slow", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["result"], false);
        assert_eq!(body["message"], "Request timed out");
    }

    #[test]
    fn test_restart_required_sections() {
        let current = GatewayConfig::default();
        let mut next = current.clone();
        next.admin.identities = vec!["42".into()];
        assert!(restart_required(&current, &next).is_empty());

        next.listener.bind_address = "127.0.0.1:1".into();
        next.usage.store_path = None;
        assert_eq!(restart_required(&current, &next), vec!["listener", "usage"]);
    }
}
