//! 播放源 provider：统一的取流接口、注册表和按优先级回退的 resolver

mod catalog;
mod embed;
mod error;
mod registry;
mod resolver;
mod scrape;

pub use catalog::{CatalogLookup, TmdbCatalog, TMDB_API_BASE};
pub use embed::{EmbedProvider, EmbedTemplate};
pub use error::ProviderError;
pub use registry::{
    ProviderConfig, ProviderDescriptor, ProviderKind, ProviderRegistry, ScrapeLimits,
    StrategyConfig,
};
pub use resolver::{StreamResolver, NO_STREAM_FOUND};
pub use scrape::{follow_embed_chain, DiscoveredMedia, ScrapeProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data_source::UpstreamFetcher;
use crate::utils::UrlUtils;

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "movie" => Some(MediaType::Movie),
            "tv" | "series" | "show" => Some(MediaType::Tv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

/// provider 模板使用的 ID 体系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    /// 目录自身的 ID，原样使用
    #[default]
    Tmdb,
    /// 需要通过目录服务换成 IMDb ID
    Imdb,
}

/// 一次取流请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub media_id: String,
    pub media_type: MediaType,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl MediaRequest {
    pub fn movie(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            media_type: MediaType::Movie,
            season: None,
            episode: None,
        }
    }

    pub fn episode(media_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            media_id: media_id.into(),
            media_type: MediaType::Tv,
            season: Some(season),
            episode: Some(episode),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Hls,
    Mp4,
    Iframe,
}

impl StreamKind {
    /// 根据扩展名推断，无法识别的按 iframe 处理
    pub fn infer(url: &str) -> Self {
        match UrlUtils::extension(url).as_deref() {
            Some("m3u8") => StreamKind::Hls,
            Some("mp4") => StreamKind::Mp4,
            _ => StreamKind::Iframe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subtitle {
    pub lang: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamSource {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: StreamKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

/// 统一的取流结果，provider 返回前必须规范化
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<StreamKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtitles: Vec<Subtitle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<StreamSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamResult {
    pub fn found(provider: &str, url: impl Into<String>, kind: StreamKind) -> Self {
        Self {
            success: true,
            url: Some(url.into()),
            kind: Some(kind),
            provider: Some(provider.to_string()),
            quality: None,
            subtitles: Vec::new(),
            sources: Vec::new(),
            error: None,
        }
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            kind: None,
            provider: None,
            quality: None,
            subtitles: Vec::new(),
            sources: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_sources(mut self, sources: Vec<StreamSource>) -> Self {
        self.sources = sources;
        self
    }

    /// 补齐缺失的类型和来源名，url 为空的成功结果视为失败
    pub fn normalize(mut self, provider: &str) -> Self {
        if !self.success {
            return self;
        }

        let url = match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => return StreamResult::not_found(format!("{} returned an empty url", provider)),
        };

        if self.kind.is_none() {
            self.kind = Some(StreamKind::infer(&url));
        }
        if self.provider.is_none() {
            self.provider = Some(provider.to_string());
        }
        self.url = Some(url);
        self.error = None;
        self
    }
}

/// provider 调用时可用的共享依赖
#[derive(Clone)]
pub struct ProviderContext {
    pub fetcher: Arc<dyn UpstreamFetcher>,
    pub catalog: Option<Arc<dyn CatalogLookup>>,
    /// 代理入口地址，如 `https://my.host/hls/proxy`
    pub proxy_endpoint: String,
}

impl ProviderContext {
    /// 按 provider 需要的 ID 体系返回媒体 ID
    pub async fn media_id(&self, scheme: IdScheme, request: &MediaRequest) -> Result<String> {
        match scheme {
            IdScheme::Tmdb => Ok(request.media_id.clone()),
            IdScheme::Imdb => {
                let catalog = self
                    .catalog
                    .as_ref()
                    .ok_or_else(|| ProviderError::Lookup("no catalog configured".to_string()))?;
                catalog
                    .external_id(&request.media_id, request.media_type, scheme)
                    .await
            }
        }
    }

    /// 把抓取到的播放列表包装成代理地址，携带抓取时的 referer
    pub fn proxied_url(&self, url: &str, referer: Option<&str>) -> String {
        UrlUtils::to_proxy_url(&UrlUtils::proxy_prefix(&self.proxy_endpoint, referer), url)
    }
}

#[async_trait]
pub trait StreamProvider: Send + Sync {
    async fn get_stream(&self, ctx: &ProviderContext, request: &MediaRequest) -> Result<StreamResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_kind_infer() {
        assert_eq!(StreamKind::infer("https://h/master.m3u8?t=1"), StreamKind::Hls);
        assert_eq!(StreamKind::infer("https://h/movie.mp4"), StreamKind::Mp4);
        assert_eq!(StreamKind::infer("https://embed.h/e/123"), StreamKind::Iframe);
    }

    #[test]
    fn test_normalize_fills_missing_fields() {
        let mut raw = StreamResult::found("x", " https://h/v.m3u8 ", StreamKind::Iframe);
        raw.kind = None;
        raw.provider = None;

        let result = raw.normalize("Alpha");
        assert!(result.success);
        assert_eq!(result.kind, Some(StreamKind::Hls));
        assert_eq!(result.provider.as_deref(), Some("Alpha"));
        assert_eq!(result.url.as_deref(), Some("https://h/v.m3u8"));
    }

    #[test]
    fn test_normalize_rejects_empty_url() {
        let result = StreamResult::found("x", "  ", StreamKind::Hls).normalize("Alpha");
        assert!(!result.success);
    }

    #[test]
    fn test_result_json_shape() {
        let json = serde_json::to_value(
            StreamResult::found("Alpha", "https://e.com/embed/1", StreamKind::Iframe).with_quality("1080p"),
        )
        .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["type"], "iframe");
        assert_eq!(json["provider"], "Alpha");
        assert_eq!(json["quality"], "1080p");
        assert!(json.get("error").is_none());

        let json = serde_json::to_value(StreamResult::not_found("no stream found")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "no stream found");
    }

    #[test]
    fn test_media_type_parse() {
        assert_eq!(MediaType::parse("Movie"), Some(MediaType::Movie));
        assert_eq!(MediaType::parse("tv"), Some(MediaType::Tv));
        assert_eq!(MediaType::parse("book"), None);
    }
}
