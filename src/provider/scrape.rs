use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use super::{
    EmbedTemplate, IdScheme, MediaRequest, MediaType, ProviderContext, Result, StreamKind,
    StreamProvider, StreamResult, StreamSource, Subtitle,
};
use crate::data_source::UpstreamFetcher;
use crate::utils::UrlUtils;
use crate::{log_debug, log_warn};

lazy_static! {
    // 绝对/协议相对地址，或引号内的相对路径
    static ref M3U8_URL: Regex = Regex::new(
        r#"(?i)(?P<abs>(?:https?:)?//[^\s"'<>\\]+?\.m3u8(?:\?[^\s"'<>\\]*)?)|["'](?P<rel>[^"'\s<>:]+?\.m3u8(?:\?[^"'\s<>]*)?)["']"#
    )
    .unwrap();
    static ref MP4_URL: Regex = Regex::new(
        r#"(?i)(?P<abs>(?:https?:)?//[^\s"'<>\\]+?\.mp4(?:\?[^\s"'<>\\]*)?)|["'](?P<rel>[^"'\s<>:]+?\.mp4(?:\?[^"'\s<>]*)?)["']"#
    )
    .unwrap();
    static ref IFRAME_SRC: Regex =
        Regex::new(r#"(?i)<iframe[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref TRACK_TAG: Regex = Regex::new(r#"(?i)<track[^>]*>"#).unwrap();
    static ref TRACK_SRC: Regex = Regex::new(r#"(?i)\ssrc\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref TRACK_LANG: Regex = Regex::new(r#"(?i)\ssrclang\s*=\s*["']([^"']+)["']"#).unwrap();
}

/// 嵌入页中找到的媒体地址
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredMedia {
    pub url: String,
    pub kind: StreamKind,
    /// 找到媒体的页面地址，请求媒体时作为 Referer
    pub page_url: String,
    /// 同一页面中的其他候选
    pub alternatives: Vec<String>,
    pub subtitles: Vec<Subtitle>,
}

/// 沿嵌入链查找媒体地址，最多进入 `max_depth` 层嵌套 iframe
pub async fn follow_embed_chain(
    fetcher: &dyn UpstreamFetcher,
    start_url: &str,
    referer: Option<&str>,
    max_depth: usize,
) -> crate::utils::error::Result<Option<DiscoveredMedia>> {
    let mut page_url = start_url.to_string();
    let mut page_referer = referer.map(str::to_string).or_else(|| UrlUtils::origin(start_url));

    for depth in 0..=max_depth {
        log_debug!("Scrape", "抓取嵌入页 (depth={}): {}", depth, page_url);
        let page = fetcher.fetch(&page_url, page_referer.as_deref()).await?;
        let html = String::from_utf8_lossy(&page.body).replace("\\/", "/");

        if let Some(found) = find_media(&html, &page.final_url) {
            return Ok(Some(found));
        }

        match find_iframe(&html, &page.final_url) {
            Some(next) if depth < max_depth => {
                page_referer = Some(page.final_url.clone());
                page_url = next;
            }
            _ => break,
        }
    }

    Ok(None)
}

fn find_media(html: &str, page_url: &str) -> Option<DiscoveredMedia> {
    let hls = collect_urls(&M3U8_URL, html, page_url);
    let mp4 = collect_urls(&MP4_URL, html, page_url);

    let (kind, mut candidates) = if !hls.is_empty() {
        (StreamKind::Hls, hls)
    } else if !mp4.is_empty() {
        (StreamKind::Mp4, mp4)
    } else {
        return None;
    };

    let url = candidates.remove(0);
    Some(DiscoveredMedia {
        url,
        kind,
        page_url: page_url.to_string(),
        alternatives: candidates,
        subtitles: find_subtitles(html, page_url),
    })
}

fn collect_urls(pattern: &Regex, html: &str, page_url: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for caps in pattern.captures_iter(html) {
        let Some(found) = caps.name("abs").or_else(|| caps.name("rel")) else {
            continue;
        };
        if let Ok(absolute) = UrlUtils::resolve(page_url, found.as_str()) {
            if !urls.contains(&absolute) {
                urls.push(absolute);
            }
        }
    }
    urls
}

fn find_iframe(html: &str, page_url: &str) -> Option<String> {
    IFRAME_SRC
        .captures_iter(html)
        .filter_map(|caps| UrlUtils::resolve(page_url, &caps[1]).ok())
        .find(|url| UrlUtils::is_absolute_url(url) && url != page_url)
}

fn find_subtitles(html: &str, page_url: &str) -> Vec<Subtitle> {
    TRACK_TAG
        .find_iter(html)
        .filter_map(|tag| {
            let tag = tag.as_str();
            let src = TRACK_SRC.captures(tag)?;
            let url = UrlUtils::resolve(page_url, &src[1]).ok()?;
            let lang = TRACK_LANG
                .captures(tag)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| "und".to_string());
            Some(Subtitle { lang, url })
        })
        .collect()
}

/// 需要抓取嵌入页才能拿到播放地址的 provider
pub struct ScrapeProvider {
    name: String,
    id_scheme: IdScheme,
    movie: Vec<EmbedTemplate>,
    tv: Vec<EmbedTemplate>,
    referer: Option<String>,
    max_attempts: usize,
    max_depth: usize,
}

impl ScrapeProvider {
    pub fn new(
        name: impl Into<String>,
        id_scheme: IdScheme,
        movie: Vec<EmbedTemplate>,
        tv: Vec<EmbedTemplate>,
        referer: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id_scheme,
            movie,
            tv,
            referer,
            max_attempts: 3,
            max_depth: 1,
        }
    }

    pub fn with_limits(mut self, max_attempts: usize, max_depth: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.max_depth = max_depth;
        self
    }

    fn to_result(&self, ctx: &ProviderContext, found: DiscoveredMedia) -> StreamResult {
        let wrap = |url: &str| match found.kind {
            StreamKind::Hls => ctx.proxied_url(url, Some(&found.page_url)),
            _ => url.to_string(),
        };

        let sources = found
            .alternatives
            .iter()
            .map(|url| StreamSource {
                url: wrap(url),
                kind: found.kind,
                quality: None,
            })
            .collect();

        let mut result = StreamResult::found(&self.name, wrap(&found.url), found.kind).with_sources(sources);
        result.subtitles = found.subtitles;
        result
    }
}

#[async_trait]
impl StreamProvider for ScrapeProvider {
    async fn get_stream(&self, ctx: &ProviderContext, request: &MediaRequest) -> Result<StreamResult> {
        let media_id = ctx.media_id(self.id_scheme, request).await?;
        let templates = match request.media_type {
            MediaType::Movie => &self.movie,
            MediaType::Tv => &self.tv,
        };

        let mut last_error = None;
        let mut reached_page = false;

        for template in templates.iter().take(self.max_attempts) {
            let embed_url = template.format(&media_id, request);
            match follow_embed_chain(
                ctx.fetcher.as_ref(),
                &embed_url,
                self.referer.as_deref(),
                self.max_depth,
            )
            .await
            {
                Ok(Some(found)) => return Ok(self.to_result(ctx, found)),
                Ok(None) => {
                    reached_page = true;
                    log_debug!("Scrape", "{} 页面中未找到媒体: {}", self.name, embed_url);
                }
                Err(e) => {
                    log_warn!("Scrape", "{} 抓取失败 {}: {}", self.name, embed_url, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !reached_page => Err(e.into()),
            _ => Ok(StreamResult::not_found(format!("{}: no media on embed page", self.name))),
        }
    }
}
