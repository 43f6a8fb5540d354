//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use api_gateway::config::GatewayConfig;
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::Shutdown;

/// Request targets (`/path?query`) seen by a mock upstream, in arrival order.
pub type Seen = Arc<Mutex<Vec<String>>>;

/// Start a mock upstream that answers every request with `status` and a JSON `body`.
pub async fn start_mock_upstream(addr: SocketAddr, status: u16, body: &'static str) -> Seen {
    start_programmable_upstream(addr, move |_| async move { (status, body.to_string()) }).await
}

/// Start a programmable mock upstream. `f` gets the request target and returns
/// the status and JSON body; it may sleep to simulate a slow collaborator.
pub async fn start_programmable_upstream<F, Fut>(addr: SocketAddr, f: F) -> Seen
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let target = read_request_target(&mut socket).await;
                        log.lock().unwrap().push(target.clone());

                        let (status, body) = f(target).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    seen
}

/// Read the request head and return the target of its request line.
async fn read_request_target(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&buf)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string()
}

/// A gateway config with every store in memory, listening on `addr`.
pub fn memory_config(addr: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = addr.to_string();
    config.keys.store_path = None;
    config.usage.store_path = None;
    config.board.store_path = None;
    config
}

/// A running gateway and the handle to stop it.
pub struct Gateway {
    pub shutdown: Shutdown,
    pub task: JoinHandle<()>,
}

impl Gateway {
    /// Trigger shutdown and wait for the final flushes.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(10), self.task).await;
    }
}

pub async fn spawn_gateway(config: GatewayConfig) -> Gateway {
    let shutdown = Shutdown::new();
    let (_, config_updates) = mpsc::unbounded_channel();
    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let server = HttpServer::new(config).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    let task = tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    // Give the admin listener (if any) a moment to bind.
    tokio::time::sleep(Duration::from_millis(200)).await;
    Gateway { shutdown, task }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
