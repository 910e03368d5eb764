use async_trait::async_trait;

use super::{
    IdScheme, MediaRequest, MediaType, ProviderContext, ProviderError, Result, StreamKind,
    StreamProvider, StreamResult,
};

/// 嵌入地址模板，支持 `{id}`、`{season}`、`{episode}` 占位符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedTemplate(String);

impl EmbedTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains("{id}") {
            return Err(ProviderError::InvalidConfig(format!(
                "template has no {{id}} placeholder: {}",
                template
            )));
        }
        if !(template.starts_with("https://") || template.starts_with("http://")) {
            return Err(ProviderError::InvalidConfig(format!(
                "template must be an absolute http(s) url: {}",
                template
            )));
        }
        Ok(Self(template))
    }

    /// 剧集缺少季/集时按第 1 季第 1 集处理
    pub fn format(&self, media_id: &str, request: &MediaRequest) -> String {
        self.0
            .replace("{id}", &urlencoding::encode(media_id))
            .replace("{season}", &request.season.unwrap_or(1).to_string())
            .replace("{episode}", &request.episode.unwrap_or(1).to_string())
    }
}

/// 只拼接固定嵌入地址的 provider，不发起网络请求
pub struct EmbedProvider {
    name: String,
    id_scheme: IdScheme,
    movie: EmbedTemplate,
    tv: EmbedTemplate,
}

impl EmbedProvider {
    pub fn new(name: impl Into<String>, id_scheme: IdScheme, movie: EmbedTemplate, tv: EmbedTemplate) -> Self {
        Self {
            name: name.into(),
            id_scheme,
            movie,
            tv,
        }
    }
}

#[async_trait]
impl StreamProvider for EmbedProvider {
    async fn get_stream(&self, ctx: &ProviderContext, request: &MediaRequest) -> Result<StreamResult> {
        let media_id = ctx.media_id(self.id_scheme, request).await?;
        let template = match request.media_type {
            MediaType::Movie => &self.movie,
            MediaType::Tv => &self.tv,
        };

        Ok(StreamResult::found(
            &self.name,
            template.format(&media_id, request),
            StreamKind::Iframe,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeFetcher;
    use std::sync::Arc;

    fn ctx() -> ProviderContext {
        ProviderContext {
            fetcher: Arc::new(FakeFetcher::new()),
            catalog: None,
            proxy_endpoint: "/hls/proxy".to_string(),
        }
    }

    fn provider(scheme: IdScheme) -> EmbedProvider {
        EmbedProvider::new(
            "Alpha",
            scheme,
            EmbedTemplate::new("https://embed.alpha.test/movie/{id}").unwrap(),
            EmbedTemplate::new("https://embed.alpha.test/tv/{id}/{season}/{episode}").unwrap(),
        )
    }

    #[test]
    fn test_template_validation() {
        assert!(EmbedTemplate::new("https://x.test/movie/").is_err());
        assert!(EmbedTemplate::new("/movie/{id}").is_err());
        assert!(EmbedTemplate::new("https://x.test/movie/{id}").is_ok());
    }

    #[tokio::test]
    async fn test_movie_and_episode_urls() {
        let p = provider(IdScheme::Tmdb);

        let movie = p.get_stream(&ctx(), &MediaRequest::movie("550")).await.unwrap();
        assert!(movie.success);
        assert_eq!(movie.url.as_deref(), Some("https://embed.alpha.test/movie/550"));
        assert_eq!(movie.kind, Some(StreamKind::Iframe));
        assert_eq!(movie.provider.as_deref(), Some("Alpha"));

        let ep = p.get_stream(&ctx(), &MediaRequest::episode("1399", 2, 5)).await.unwrap();
        assert_eq!(ep.url.as_deref(), Some("https://embed.alpha.test/tv/1399/2/5"));
    }

    #[tokio::test]
    async fn test_missing_episode_defaults_to_first() {
        let p = provider(IdScheme::Tmdb);
        let request = MediaRequest {
            media_id: "1399".to_string(),
            media_type: MediaType::Tv,
            season: None,
            episode: None,
        };
        let result = p.get_stream(&ctx(), &request).await.unwrap();
        assert_eq!(result.url.as_deref(), Some("https://embed.alpha.test/tv/1399/1/1"));
    }

    #[tokio::test]
    async fn test_imdb_scheme_without_catalog_fails() {
        let p = provider(IdScheme::Imdb);
        let err = p.get_stream(&ctx(), &MediaRequest::movie("550")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Lookup(_)));
    }
}
