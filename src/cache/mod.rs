mod disk;
mod manager;
mod memory;

pub use disk::DiskCache;
pub use manager::CacheManager;
pub use memory::MemoryCache;

use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::time::Duration;

use crate::data_source::EchoHeaders;
use crate::utils::UrlUtils;

pub const DEFAULT_MANIFEST_TTL: Duration = Duration::from_secs(10);
pub const DEFAULT_SEGMENT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_MEMORY_ENTRIES: usize = 2048;
pub const DEFAULT_MEMORY_BYTES: usize = 512 * 1024 * 1024;

const SEGMENT_EXTENSIONS: [&str; 6] = ["ts", "m4s", "mp4", "aac", "m4a", "mp3"];

/// 缓存键：完整上游 URL 的 sha1 十六进制
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// 根据 URL 后缀判断的文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// .m3u8 播放列表
    Manifest,
    /// 媒体分片，内容发布后不变
    Segment,
    /// 其他二进制（密钥、字幕等）
    Opaque,
}

impl FileKind {
    pub fn from_url(url: &str) -> Self {
        match UrlUtils::extension(url).as_deref() {
            Some("m3u8") => FileKind::Manifest,
            Some(ext) if SEGMENT_EXTENSIONS.contains(&ext) => FileKind::Segment,
            _ => FileKind::Opaque,
        }
    }

    /// 只有分片写入磁盘
    pub fn uses_disk(&self) -> bool {
        matches!(self, FileKind::Segment)
    }

    /// 无扩展名的地址按内容再判断一次，播放列表必须用短 TTL
    pub fn refine(self, payload: &[u8]) -> Self {
        match self {
            FileKind::Opaque if looks_like_manifest(payload) => FileKind::Manifest,
            kind => kind,
        }
    }
}

/// 内容以 `#EXTM3U` 开头（允许前导空白和 UTF-8 BOM）
pub fn looks_like_manifest(payload: &[u8]) -> bool {
    let start = payload
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(payload.len());
    let trimmed = payload[start..].strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&payload[start..]);
    trimmed.starts_with(b"#EXTM3U")
}

#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub manifest_ttl: Duration,
    pub segment_ttl: Duration,
    pub max_memory_entries: usize,
    /// 内存层负载总字节数上限
    pub max_memory_bytes: usize,
}

impl CachePolicy {
    pub fn ttl_for(&self, kind: FileKind) -> Duration {
        match kind {
            FileKind::Manifest => self.manifest_ttl,
            FileKind::Segment | FileKind::Opaque => self.segment_ttl,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            manifest_ttl: DEFAULT_MANIFEST_TTL,
            segment_ttl: DEFAULT_SEGMENT_TTL,
            max_memory_entries: DEFAULT_MEMORY_ENTRIES,
            max_memory_bytes: DEFAULT_MEMORY_BYTES,
        }
    }
}

/// 缓存条目，创建后只读
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    /// 内容实际来源地址（重定向后），改写播放列表时作为基准
    pub source_url: String,
    pub payload: Bytes,
    pub headers: EchoHeaders,
    /// 过期时间，毫秒时间戳
    pub expires_at: i64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }
}

/// 时钟抽象，测试中可替换
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
