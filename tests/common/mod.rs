//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use request_shield::collaborators::{FeedReport, GeoLookup, LookupError, ReputationFeed};
use request_shield::{Shield, ShieldConfig, ShieldRequest};

/// Default config adjusted by `adjust`.
pub fn config_with(adjust: impl FnOnce(&mut ShieldConfig)) -> ShieldConfig {
    let mut config = ShieldConfig::default();
    adjust(&mut config);
    config
}

pub fn shield_with(adjust: impl FnOnce(&mut ShieldConfig)) -> Arc<Shield> {
    Arc::new(Shield::new(config_with(adjust)))
}

/// A well-formed browser request.
pub fn browser(ip: &str, path: &str) -> ShieldRequest {
    ShieldRequest::browser(ip, path)
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// Feed that rates every address the same.
pub struct StaticFeed(pub u8);

#[async_trait]
impl ReputationFeed for StaticFeed {
    async fn lookup(&self, _ip: IpAddr) -> Result<FeedReport, LookupError> {
        Ok(FeedReport {
            score: self.0,
            is_tor: false,
            is_vpn: false,
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Geo lookup that maps every address to one country.
pub struct StaticGeo(pub Option<&'static str>);

#[async_trait]
impl GeoLookup for StaticGeo {
    async fn country(&self, _ip: IpAddr) -> Result<Option<String>, LookupError> {
        Ok(self.0.map(str::to_string))
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Geo lookup that always fails.
pub struct FailingGeo;

#[async_trait]
impl GeoLookup for FailingGeo {
    async fn country(&self, _ip: IpAddr) -> Result<Option<String>, LookupError> {
        Err(LookupError::InvalidResponse("HTTP 502".into()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Start a programmable HTTP backend on an ephemeral port.
///
/// `f` receives the request path and returns status plus JSON body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
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
                        let mut buf = vec![0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]);
                        let path = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();

                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
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
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
