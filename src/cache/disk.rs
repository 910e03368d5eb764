use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

use super::CacheEntry;
use crate::data_source::EchoHeaders;
use crate::log_debug;
use crate::utils::error::Result;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 元数据文件 `<key>.json`
#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    headers: EchoHeaders,
    /// 毫秒时间戳
    expires: i64,
}

/// 磁盘缓存层：每个键对应 `<key>.bin` 和 `<key>.json` 两个文件
pub struct DiskCache {
    cache_dir: PathBuf,
}

impl DiskCache {
    pub async fn new(cache_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).await?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.bin", key))
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// 读取条目，只有两个文件都存在且未过期才算有效
    pub async fn load(&self, key: &str, now_ms: i64) -> Result<Option<CacheEntry>> {
        let sidecar = match fs::read(self.sidecar_path(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let sidecar: Sidecar = match serde_json::from_slice(&sidecar) {
            Ok(sidecar) => sidecar,
            Err(_) => {
                log_debug!("DiskCache", "元数据损坏，按未命中处理: {}", key);
                self.remove(key).await;
                return Ok(None);
            }
        };

        if sidecar.expires <= now_ms {
            log_debug!("DiskCache", "条目已过期: {}", key);
            self.remove(key).await;
            return Ok(None);
        }

        let payload = match fs::read(self.payload_path(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(CacheEntry {
            key: key.to_string(),
            source_url: String::new(),
            payload: Bytes::from(payload),
            headers: sidecar.headers,
            expires_at: sidecar.expires,
        }))
    }

    /// 先写数据文件，最后写元数据，读者不会看到缺少元数据的数据
    pub async fn store(&self, entry: &CacheEntry) -> Result<()> {
        write_atomic(&self.payload_path(&entry.key), &entry.payload).await?;

        let sidecar = Sidecar {
            headers: entry.headers.clone(),
            expires: entry.expires_at,
        };
        let raw = serde_json::to_vec(&sidecar)?;
        write_atomic(&self.sidecar_path(&entry.key), &raw).await?;

        log_debug!("DiskCache", "写入缓存 {} ({} 字节)", entry.key, entry.payload.len());
        Ok(())
    }

    async fn remove(&self, key: &str) {
        // 元数据先删，避免留下看似有效的半条目
        let _ = fs::remove_file(self.sidecar_path(key)).await;
        let _ = fs::remove_file(self.payload_path(key)).await;
    }
}

/// 写临时文件再 rename，避免并发读到半个文件
async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("tmp-{}-{}", std::process::id(), seq));

    if let Err(e) = fs::write(&tmp, data).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    fs::rename(&tmp, path).await
}
