use super::CacheEntry;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 进程内缓存层，过期条目在下次查询时惰性移除
///
/// 同时限制条目数和负载总字节数，超出时先清理过期条目，再淘汰最早过期的。
pub struct MemoryCache {
    store: RwLock<Store>,
    capacity: usize,
    max_bytes: usize,
}

#[derive(Default)]
struct Store {
    entries: HashMap<String, CacheEntry>,
    bytes: usize,
}

impl Store {
    fn remove(&mut self, key: &str) {
        if let Some(old) = self.entries.remove(key) {
            self.bytes -= old.payload.len();
        }
    }

    fn purge_expired(&mut self, now_ms: i64) {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.is_fresh(now_ms))
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.remove(&key);
        }
    }

    fn evict_oldest(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.expires_at)
            .map(|(k, _)| k.clone());
        match oldest {
            Some(key) => {
                self.remove(&key);
                true
            }
            None => false,
        }
    }
}

impl MemoryCache {
    pub fn new(capacity: usize, max_bytes: usize) -> Self {
        Self {
            store: RwLock::new(Store::default()),
            capacity: capacity.max(1),
            max_bytes,
        }
    }

    pub async fn get(&self, key: &str, now_ms: i64) -> Option<CacheEntry> {
        {
            let store = self.store.read().await;
            match store.entries.get(key) {
                Some(entry) if entry.is_fresh(now_ms) => return Some(entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut store = self.store.write().await;
        if let Some(entry) = store.entries.get(key) {
            // 释放读锁后可能已被其他请求刷新
            if entry.is_fresh(now_ms) {
                return Some(entry.clone());
            }
            store.remove(key);
        }
        None
    }

    pub async fn put(&self, entry: CacheEntry, now_ms: i64) {
        let size = entry.payload.len();
        // 单个条目超过预算时只返回给调用方，不进内存
        if size > self.max_bytes {
            return;
        }

        let mut store = self.store.write().await;
        store.remove(&entry.key);

        let over = |s: &Store| s.entries.len() >= self.capacity || s.bytes + size > self.max_bytes;
        if over(&*store) {
            store.purge_expired(now_ms);
            while over(&*store) && store.evict_oldest() {}
        }

        store.bytes += size;
        store.entries.insert(entry.key.clone(), entry);
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.entries.is_empty()
    }

    /// 当前负载总字节数
    pub async fn bytes(&self) -> usize {
        self.store.read().await.bytes
    }
}
