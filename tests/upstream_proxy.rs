//! Catalogue routes against mock upstreams.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_gateway::config::{GatewayConfig, UpstreamRouteConfig};
use serde_json::Value;

mod common;

fn route(path: &str, upstream: SocketAddr, extra: &str) -> UpstreamRouteConfig {
    toml::from_str(&format!(
        "path = \"{}\"\ntarget = \"http://{}/answer\"\n{}",
        path, upstream, extra
    ))
    .unwrap()
}

fn gateway_config(addr: SocketAddr, routes: Vec<UpstreamRouteConfig>) -> GatewayConfig {
    let mut config = common::memory_config(addr);
    config.upstream.routes = routes;
    config.upstream.retries.base_delay_ms = 10;
    config.upstream.retries.max_delay_ms = 50;
    config
}

async fn get(url: String) -> (u16, Value) {
    let res = common::client().get(url).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_wraps_and_formats_answer() {
    let upstream: SocketAddr = "127.0.0.1:28381".parse().unwrap();
    let addr: SocketAddr = "127.0.0.1:28382".parse().unwrap();
    let seen = common::start_mock_upstream(
        upstream,
        200,
        r#"{"status":true,"data":"Halo. Apa kabar?"}"#,
    )
    .await;

    let config = gateway_config(
        addr,
        vec![route(
            "/api/ai/test",
            upstream,
            r#"
            required_params = ["prompt", "content"]
            defaults = { content = "hai" }
            message = "AI answer"
            extract = "/data"
            format_paragraphs = true
            "#,
        )],
    );
    let gateway = common::spawn_gateway(config).await;

    let (status, body) = get(format!("http://{}/api/ai/test", addr)).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Missing required parameter(s): prompt");
    assert!(seen.lock().unwrap().is_empty());

    let (status, body) = get(format!("http://{}/api/ai/test?prompt=hello", addr)).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"], true);
    assert_eq!(body["message"], "AI answer");
    assert_eq!(body["data"], "Halo.\n\nApa kabar?");

    let targets = seen.lock().unwrap().clone();
    assert_eq!(targets, vec!["/answer?content=hai&prompt=hello".to_string()]);

    gateway.stop().await;
}

#[tokio::test]
async fn test_upstream_failure_is_enveloped() {
    let upstream: SocketAddr = "127.0.0.1:28383".parse().unwrap();
    let addr: SocketAddr = "127.0.0.1:28384".parse().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    common::start_programmable_upstream(upstream, move |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (503, r#"{"error":"overloaded"}"#.to_string())
        }
    })
    .await;

    let config = gateway_config(
        addr,
        vec![route(
            "/api/flaky",
            upstream,
            "failure_message = \"Flaky service is down\"",
        )],
    );
    let gateway = common::spawn_gateway(config).await;

    let (status, body) = get(format!("http://{}/api/flaky", addr)).await;
    assert_eq!(status, 500);
    assert_eq!(body["result"], false);
    assert_eq!(body["message"], "Flaky service is down");
    // Default policy: one retry on 5xx.
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    gateway.stop().await;
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let upstream: SocketAddr = "127.0.0.1:28385".parse().unwrap();
    let addr: SocketAddr = "127.0.0.1:28386".parse().unwrap();
    common::start_programmable_upstream(upstream, |_| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, r#"{"data":"too late"}"#.to_string())
    })
    .await;

    let mut config = gateway_config(addr, vec![route("/api/slow", upstream, "")]);
    config.timeouts.upstream_secs = 1;
    let gateway = common::spawn_gateway(config).await;

    let (status, body) = get(format!("http://{}/api/slow", addr)).await;
    assert_eq!(status, 500);
    assert_eq!(body["message"], "Upstream service unavailable");

    gateway.stop().await;
}

#[tokio::test]
async fn test_protected_route_and_passthrough() {
    let upstream: SocketAddr = "127.0.0.1:28387".parse().unwrap();
    let addr: SocketAddr = "127.0.0.1:28388".parse().unwrap();
    let seen = common::start_mock_upstream(upstream, 200, r#"{"custom":[1,2,3]}"#).await;

    let config = gateway_config(
        addr,
        vec![route(
            "/api/private",
            upstream,
            "protected = true\npassthrough = true",
        )],
    );
    let gateway = common::spawn_gateway(config).await;

    let (status, _) = get(format!("http://{}/api/private", addr)).await;
    assert_eq!(status, 400);
    let (status, _) = get(format!("http://{}/api/private?username=dave", addr)).await;
    assert_eq!(status, 401);
    let (status, _) = get(format!("http://{}/api/private?username=dave&apikey=abcdef", addr)).await;
    assert_eq!(status, 403);
    assert!(seen.lock().unwrap().is_empty());

    let (_, issued) = get(format!("http://{}/api/keys?accountId=dave", addr)).await;
    let key = issued["apikey"].as_str().unwrap().to_string();

    let (status, body) = get(format!(
        "http://{}/api/private?username=dave&apikey={}&q=1",
        addr, key
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, serde_json::json!({ "custom": [1, 2, 3] }));
    assert_eq!(seen.lock().unwrap().clone(), vec!["/answer?q=1".to_string()]);

    gateway.stop().await;
}
