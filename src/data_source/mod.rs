pub mod net_source;

pub use net_source::{NetSource, NetSourceConfig};

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;

use crate::utils::error::Result;

/// 需要回显给客户端的上游响应头
pub const ECHO_HEADERS: [&str; 2] = ["content-type", "cache-control"];

/// 缓存并回显的响应头子集，键均为小写
pub type EchoHeaders = BTreeMap<String, String>;

/// 一次上游请求的结果
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// 跟随重定向后的最终地址
    pub final_url: String,
    pub status: u16,
    pub headers: EchoHeaders,
    pub body: Bytes,
}

/// 上游获取器，不做重试，重试策略由调用方决定
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedResource>;
}
