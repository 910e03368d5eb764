use std::sync::Arc;

use super::{cache_key, CacheEntry, CachePolicy, Clock, DiskCache, FileKind, MemoryCache};
use crate::data_source::UpstreamFetcher;
use crate::utils::error::Result;
use crate::{log_debug, log_warn};

/// 两级缓存服务：播放列表只进内存，分片先查磁盘再查内存
pub struct CacheManager {
    memory: MemoryCache,
    disk: Option<DiskCache>,
    fetcher: Arc<dyn UpstreamFetcher>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl CacheManager {
    pub fn new(
        fetcher: Arc<dyn UpstreamFetcher>,
        disk: Option<DiskCache>,
        policy: CachePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            memory: MemoryCache::new(policy.max_memory_entries, policy.max_memory_bytes),
            disk,
            fetcher,
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn fetcher(&self) -> Arc<dyn UpstreamFetcher> {
        self.fetcher.clone()
    }

    /// 命中且未过期时不访问上游；未命中时请求上游并写入缓存
    pub async fn fetch_with_cache(
        &self,
        url: &str,
        kind: FileKind,
        referer: Option<&str>,
    ) -> Result<CacheEntry> {
        let key = cache_key(url);
        let now = self.clock.now_ms();
        let disk = self.disk.as_ref().filter(|_| kind.uses_disk());

        if let Some(disk) = disk {
            match disk.load(&key, now).await {
                Ok(Some(mut entry)) => {
                    log_debug!("Cache", "磁盘命中: {}", url);
                    entry.source_url = url.to_string();
                    self.memory.put(entry.clone(), now).await;
                    return Ok(entry);
                }
                Ok(None) => {}
                Err(e) => log_warn!("Cache", "读取磁盘缓存失败，按未命中处理 {}: {}", url, e),
            }
        }

        if let Some(entry) = self.memory.get(&key, now).await {
            log_debug!("Cache", "内存命中: {}", url);
            return Ok(entry);
        }

        log_debug!("Cache", "缓存未命中，从源站获取: {}", url);
        let fetched = self.fetcher.fetch(url, referer).await?;
        let kind = kind.refine(&fetched.body);

        let ttl_ms = self.policy.ttl_for(kind).as_millis() as i64;
        let entry = CacheEntry {
            key,
            source_url: fetched.final_url,
            payload: fetched.body,
            headers: fetched.headers,
            expires_at: now + ttl_ms,
        };

        self.memory.put(entry.clone(), now).await;

        if let Some(disk) = self.disk.as_ref().filter(|_| kind.uses_disk()) {
            if let Err(e) = disk.store(&entry).await {
                log_warn!("Cache", "保存到磁盘缓存失败 {}: {}", url, e);
            }
        }

        Ok(entry)
    }
}
