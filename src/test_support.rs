//! 测试用的假上游、手动时钟和本地 HTTP 服务

use async_trait::async_trait;
use bytes::Bytes;
use hyper::server::Server;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response};
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::cache::Clock;
use crate::data_source::{EchoHeaders, FetchedResource, UpstreamFetcher};
use crate::utils::error::{ProxyError, Result};

pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

enum Canned {
    Ok(String, Bytes),
    Status(u16),
    Network,
}

/// 记录调用次数的假上游，未登记的地址返回 404
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, Canned>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: &str, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Canned::Ok(content_type.to_string(), body.into()));
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Canned::Status(status));
        self
    }

    pub fn with_network_error(self, url: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Canned::Network);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(String, Option<String>)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedResource> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((url.to_string(), referer.map(str::to_string)));

        let responses = self.responses.lock().unwrap();
        match responses.get(url) {
            Some(Canned::Ok(content_type, body)) => {
                let mut headers = EchoHeaders::new();
                headers.insert("content-type".to_string(), content_type.clone());
                Ok(FetchedResource {
                    final_url: url.to_string(),
                    status: 200,
                    headers,
                    body: body.clone(),
                })
            }
            Some(Canned::Status(status)) => Err(ProxyError::Upstream { status: *status }),
            Some(Canned::Network) => Err(ProxyError::Network("connection reset".to_string())),
            None => Err(ProxyError::Upstream { status: 404 }),
        }
    }
}

/// 在 127.0.0.1 的随机端口上启动 hyper 服务，返回监听地址
pub async fn spawn_http_server<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(Request<Body>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    let make_svc = make_service_fn(move |_conn| {
        let handler = handler.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let response = handler(req);
                async move { Ok::<_, Infallible>(response.await) }
            }))
        }
    });

    let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
    let server = Server::try_bind(&addr).unwrap().serve(make_svc);
    let local = server.local_addr();
    tokio::spawn(server);
    local
}
