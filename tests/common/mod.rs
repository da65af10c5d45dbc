//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_science::config::ScienceConfig;
use http_science::lifecycle::Shutdown;
use http_science::stats::{DiffAggregator, MemorySink};
use http_science::ScienceServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Read one HTTP/1.1 request (head plus Content-Length body) and return its body.
async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return Vec::new(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    buf[head_end..].to_vec()
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        201 => "201 Created",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a backend whose reply is computed from the request body.
///
/// Every reply carries a unique `Date` header so header stripping is always exercised.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let body = read_request(&mut socket).await;
                        let (status, reply) = f(body).await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nDate: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text(status),
                            uuid::Uuid::new_v4(),
                            reply.len(),
                            reply
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that always returns `body` with `status`.
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (status, body.to_string()) }).await
}

/// Start a backend that echoes the request body.
pub async fn start_echo_backend() -> SocketAddr {
    start_programmable_backend(|body| async move { (200, String::from_utf8_lossy(&body).into_owned()) })
        .await
}

/// An address nothing is listening on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn config_for(control: SocketAddr, experiment: SocketAddr) -> ScienceConfig {
    let mut config = ScienceConfig::default();
    config.backends.control = control.to_string();
    config.backends.experiment = format!("http://{}", experiment);
    config
}

/// A running science proxy plus handles to observe it.
pub struct RunningScience {
    pub addr: SocketAddr,
    pub aggregator: Arc<DiffAggregator>,
    pub diff_log: MemorySink,
    pub shutdown: Shutdown,
}

impl RunningScience {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Diff log contents once every queued record is written.
    pub async fn logged_diffs(&self) -> String {
        self.aggregator.flush().await;
        self.diff_log.contents()
    }
}

impl Drop for RunningScience {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_science(config: ScienceConfig) -> RunningScience {
    let diff_log = MemorySink::new();
    let aggregator = Arc::new(DiffAggregator::new(Box::new(diff_log.clone())).unwrap());
    let server = ScienceServer::new(config, aggregator.clone()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningScience {
        addr,
        aggregator,
        diff_log,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
