use super::{EchoHeaders, FetchedResource, UpstreamFetcher, ECHO_HEADERS};
use crate::utils::error::{ProxyError, Result};
use crate::utils::UrlUtils;
use crate::{log_debug, log_warn};
use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::StreamExt;
use hyper::client::HttpConnector;
use hyper::header::{HeaderValue, ACCEPT, LOCATION, REFERER, USER_AGENT};
use hyper::{Body, Client, Request, Response};
use hyper_tls::HttpsConnector;
use std::time::Duration;
use tokio::time::timeout;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone)]
pub struct NetSourceConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_payload_bytes: usize,
}

impl Default for NetSourceConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(20),
            max_payload_bytes: 64 * 1024 * 1024,
        }
    }
}

/// 基于 hyper 的上游获取器，带固定的浏览器身份
pub struct NetSource {
    client: Client<HttpsConnector<HttpConnector>>,
    config: NetSourceConfig,
}

impl NetSource {
    pub fn new(config: NetSourceConfig) -> Self {
        let https = HttpsConnector::new();
        let client = Client::builder().build::<_, Body>(https);

        Self { client, config }
    }

    fn build_request(&self, url: &str, referer: Option<&str>) -> Result<Request<Body>> {
        let mut builder = Request::builder()
            .method("GET")
            .uri(url)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .header(ACCEPT, "*/*");

        if let Some(referer) = referer {
            if let Ok(value) = HeaderValue::from_str(referer) {
                builder = builder.header(REFERER, value);
            }
        }

        Ok(builder.body(Body::empty())?)
    }

    async fn send(&self, url: &str, referer: Option<&str>) -> Result<FetchedResource> {
        let mut current = url.to_string();

        for _ in 0..=MAX_REDIRECTS {
            let req = self.build_request(&current, referer)?;
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| ProxyError::Network(format!("请求失败 {}: {}", current, e)))?;

            let status = resp.status();
            if status.is_redirection() {
                let location = resp
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(ProxyError::Upstream { status: status.as_u16() })?;
                let next = UrlUtils::resolve(&current, location)?;
                log_debug!("NetSource", "重定向 {} -> {}", current, next);
                current = next;
                continue;
            }

            if !status.is_success() {
                log_warn!("NetSource", "上游返回错误状态 {}: {}", status, current);
                return Err(ProxyError::Upstream { status: status.as_u16() });
            }

            let headers = extract_echo_headers(&resp);
            let body = self.read_body(resp).await?;
            log_debug!("NetSource", "下载完成 {} ({} 字节)", current, body.len());

            return Ok(FetchedResource {
                final_url: current,
                status: status.as_u16(),
                headers,
                body,
            });
        }

        Err(ProxyError::Network(format!("重定向次数过多: {}", url)))
    }

    async fn read_body(&self, resp: Response<Body>) -> Result<bytes::Bytes> {
        let mut body = BytesMut::new();
        let mut stream = resp.into_body();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProxyError::Network(format!("读取响应失败: {}", e)))?;
            if body.len() + chunk.len() > self.config.max_payload_bytes {
                return Err(ProxyError::Network(format!(
                    "响应体超过上限 {} 字节",
                    self.config.max_payload_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

#[async_trait]
impl UpstreamFetcher for NetSource {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedResource> {
        if !UrlUtils::is_absolute_url(url) {
            return Err(ProxyError::InvalidRequest(format!("不支持的上游地址: {}", url)));
        }

        match timeout(self.config.timeout, self.send(url, referer)).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::Network(format!(
                "请求超时 ({}s): {}",
                self.config.timeout.as_secs(),
                url
            ))),
        }
    }
}

fn extract_echo_headers(resp: &Response<Body>) -> EchoHeaders {
    let mut headers = EchoHeaders::new();
    for name in ECHO_HEADERS {
        if let Some(value) = resp.headers().get(name).and_then(|v| v.to_str().ok()) {
            headers.insert(name.to_string(), value.to_string());
        }
    }
    headers
}
