use hyper::server::Server;
use hyper::service::{make_service_fn, service_fn};
use std::sync::Arc;

use crate::cache::{CacheManager, DiskCache, SystemClock};
use crate::config::Config;
use crate::data_source::{NetSource, UpstreamFetcher};
use crate::hls::HlsProxy;
use crate::provider::{
    CatalogLookup, ProviderContext, ProviderRegistry, StreamResolver, TmdbCatalog,
};
use crate::request_handler::{handle_request, PROXY_PATH, SERVERLESS_PATH};
use crate::utils::error::{ProxyError, Result};
use crate::{log_info, log_warn};

/// 所有请求共享的服务对象
pub struct AppState {
    pub hls: HlsProxy,
    pub resolver: StreamResolver,
    /// 对外源站地址，不带末尾 `/`；为空时生成相对地址
    pub public_origin: String,
}

impl AppState {
    pub fn new(hls: HlsProxy, resolver: StreamResolver, public_origin: impl Into<String>) -> Self {
        Self {
            hls,
            resolver,
            public_origin: public_origin.into(),
        }
    }

    pub fn proxy_endpoint(&self) -> String {
        format!("{}{}", self.public_origin, PROXY_PATH)
    }

    pub fn serverless_endpoint(&self) -> String {
        format!("{}{}", self.public_origin, SERVERLESS_PATH)
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let fetcher: Arc<dyn UpstreamFetcher> = Arc::new(NetSource::new(config.net_source_config()));

        let disk = DiskCache::new(&config.cache_dir).await?;
        log_info!("Server", "缓存目录: {}", disk.cache_dir().display());

        let cache = CacheManager::new(
            fetcher.clone(),
            Some(disk),
            config.cache_policy(),
            Arc::new(SystemClock),
        );

        let registry = match &config.providers_file {
            Some(path) => ProviderRegistry::load_from_file(path, config.scrape_limits())
                .map_err(|e| ProxyError::Config(format!("providers file: {}", e)))?,
            None => {
                log_warn!("Server", "未配置 provider 列表，/api/stream 将始终返回未找到");
                ProviderRegistry::new()
            }
        };

        let catalog = match &config.tmdb_api_key {
            Some(key) => {
                let catalog = TmdbCatalog::new(config.tmdb_api_base.as_str(), key.as_str())
                    .map_err(|e| ProxyError::Config(format!("tmdb client: {}", e)))?;
                Some(Arc::new(catalog) as Arc<dyn CatalogLookup>)
            }
            None => None,
        };

        let proxy_endpoint = format!("{}{}", config.public_origin(), PROXY_PATH);
        let ctx = ProviderContext {
            fetcher,
            catalog,
            proxy_endpoint,
        };

        Ok(Self::new(
            HlsProxy::new(Arc::new(cache)),
            StreamResolver::new(registry, ctx),
            config.public_origin(),
        ))
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::from_config(&config).await?);
    log_info!(
        "Server",
        "已加载 {} 个 provider: {:?}",
        state.resolver.registry().len(),
        state.resolver.registry().keys()
    );

    let make_svc = make_service_fn(move |_conn| {
        let state = state.clone();
        async move {
            Ok::<_, ProxyError>(service_fn(move |req| handle_request(req, state.clone())))
        }
    });

    let server = Server::try_bind(&addr)?
        .serve(make_svc)
        .with_graceful_shutdown(shutdown_signal());

    log_info!("Server", "代理服务器正在运行在 http://{}", addr);

    server.await.map_err(ProxyError::Http)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // 监听失败时不能立即触发关闭
        log_warn!("Server", "无法监听退出信号: {}", e);
        std::future::pending::<()>().await;
    }
    log_info!("Server", "收到退出信号，正在关闭");
}
