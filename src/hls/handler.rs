use bytes::Bytes;
use std::sync::Arc;

use super::{inspect_playlist, rewrite_manifest_with};
use crate::cache::{looks_like_manifest, CacheManager, FileKind};
use crate::data_source::{EchoHeaders, UpstreamFetcher};
use crate::utils::error::Result;
use crate::{log_debug, log_info};

pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// 代理后的响应内容
#[derive(Debug, Clone)]
pub struct ProxiedBody {
    pub headers: EchoHeaders,
    pub body: Bytes,
}

/// 播放列表和分片代理，供有状态和无状态两个入口共用
pub struct HlsProxy {
    cache: Arc<CacheManager>,
    fetcher: Arc<dyn UpstreamFetcher>,
}

impl HlsProxy {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        let fetcher = cache.fetcher();
        Self { cache, fetcher }
    }

    /// 走两级缓存，按扩展名区分播放列表和分片
    pub async fn proxy<F>(&self, url: &str, referer: Option<&str>, to_proxy: F) -> Result<ProxiedBody>
    where
        F: Fn(&str) -> String,
    {
        let kind = FileKind::from_url(url);
        let entry = self.cache.fetch_with_cache(url, kind, referer).await?;

        if kind == FileKind::Manifest || looks_like_manifest(&entry.payload) {
            return self.rewrite(&entry.payload, &entry.source_url, to_proxy);
        }

        log_debug!("HLS", "返回分片 {} ({} 字节)", url, entry.payload.len());
        Ok(ProxiedBody {
            headers: entry.headers,
            body: entry.payload,
        })
    }

    /// 无状态入口：每次直接请求上游，不使用缓存
    pub async fn proxy_stateless<F>(
        &self,
        url: &str,
        manifest: bool,
        referer: Option<&str>,
        to_proxy: F,
    ) -> Result<ProxiedBody>
    where
        F: Fn(&str) -> String,
    {
        let fetched = self.fetcher.fetch(url, referer).await?;

        if manifest {
            return self.rewrite(&fetched.body, &fetched.final_url, to_proxy);
        }

        Ok(ProxiedBody {
            headers: fetched.headers,
            body: fetched.body,
        })
    }

    fn rewrite<F>(&self, payload: &[u8], base_url: &str, to_proxy: F) -> Result<ProxiedBody>
    where
        F: Fn(&str) -> String,
    {
        let content = String::from_utf8_lossy(payload);
        if let Some(summary) = inspect_playlist(&content) {
            log_info!("HLS", "{} <- {}", summary, base_url);
        }

        let rewritten = rewrite_manifest_with(&content, base_url, to_proxy)?;

        let mut headers = EchoHeaders::new();
        headers.insert("content-type".to_string(), HLS_CONTENT_TYPE.to_string());
        headers.insert("cache-control".to_string(), "no-cache".to_string());

        Ok(ProxiedBody {
            headers,
            body: Bytes::from(rewritten),
        })
    }
}
