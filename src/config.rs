use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CachePolicy;
use crate::data_source::{net_source::DEFAULT_USER_AGENT, NetSourceConfig};
use crate::provider::{ScrapeLimits, TMDB_API_BASE};
use crate::utils::error::{ProxyError, Result};

#[derive(Parser, Debug, Clone)]
#[command(name = "stream-proxy")]
#[command(about = "HLS proxy with manifest rewriting and stream resolution", long_about = None)]
pub struct Config {
    /// 监听地址
    #[arg(long, env = "PROXY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// 监听端口
    #[arg(long, env = "PROXY_PORT", default_value = "8080")]
    pub port: u16,

    /// 磁盘缓存目录，启动时自动创建
    #[arg(long, env = "PROXY_CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,

    /// 对外访问的源站地址，如 https://proxy.example.com；为空时改写为相对地址
    #[arg(long, env = "PROXY_PUBLIC_ORIGIN", default_value = "")]
    pub public_origin: String,

    /// 播放列表缓存秒数
    #[arg(long, env = "PROXY_MANIFEST_TTL", default_value = "10")]
    pub manifest_ttl_secs: u64,

    /// 分片缓存秒数
    #[arg(long, env = "PROXY_SEGMENT_TTL", default_value = "3600")]
    pub segment_ttl_secs: u64,

    /// 内存缓存最多条目数
    #[arg(long, env = "PROXY_MEMORY_ENTRIES", default_value = "2048")]
    pub memory_entries: usize,

    /// 内存缓存负载总字节数上限
    #[arg(long, env = "PROXY_MEMORY_BYTES", default_value = "536870912")]
    pub memory_bytes: usize,

    /// 上游请求超时秒数
    #[arg(long, env = "PROXY_UPSTREAM_TIMEOUT", default_value = "20")]
    pub upstream_timeout_secs: u64,

    /// 单个上游响应体上限
    #[arg(long, env = "PROXY_MAX_PAYLOAD_BYTES", default_value = "67108864")]
    pub max_payload_bytes: usize,

    #[arg(long, env = "PROXY_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// provider 列表 (JSON)
    #[arg(long, env = "PROXY_PROVIDERS_FILE")]
    pub providers_file: Option<PathBuf>,

    #[arg(long, env = "PROXY_SCRAPE_ATTEMPTS", default_value = "3")]
    pub scrape_attempts: usize,

    #[arg(long, env = "PROXY_SCRAPE_DEPTH", default_value = "1")]
    pub scrape_depth: usize,

    /// TMDB API key，未设置时只能使用 TMDB ID 的 provider
    #[arg(long, env = "TMDB_API_KEY")]
    pub tmdb_api_key: Option<String>,

    #[arg(long, env = "TMDB_API_BASE", default_value = TMDB_API_BASE)]
    pub tmdb_api_base: String,

    #[arg(long, env = "PROXY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// 输出 JSON 格式日志
    #[arg(long, env = "PROXY_LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Config {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ProxyError::Config(format!("bad listen address: {}", e)))
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            manifest_ttl: Duration::from_secs(self.manifest_ttl_secs),
            segment_ttl: Duration::from_secs(self.segment_ttl_secs),
            max_memory_entries: self.memory_entries,
            max_memory_bytes: self.memory_bytes,
        }
    }

    pub fn net_source_config(&self) -> NetSourceConfig {
        NetSourceConfig {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.upstream_timeout_secs),
            max_payload_bytes: self.max_payload_bytes,
        }
    }

    pub fn scrape_limits(&self) -> ScrapeLimits {
        ScrapeLimits {
            max_attempts: self.scrape_attempts.max(1),
            max_depth: self.scrape_depth,
        }
    }

    /// 去掉末尾的 `/`，避免拼出 `//hls/proxy`
    pub fn public_origin(&self) -> &str {
        self.public_origin.trim_end_matches('/')
    }
}
