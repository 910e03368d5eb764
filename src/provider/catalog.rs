use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{IdScheme, MediaType, ProviderError, Result};
use crate::log_debug;

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

/// 目录元数据服务：把目录 ID 换成 provider 需要的 ID
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn external_id(&self, media_id: &str, media_type: MediaType, scheme: IdScheme) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

/// 基于 TMDB REST 接口的实现
pub struct TmdbCatalog {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl TmdbCatalog {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn external_ids_url(&self, media_id: &str, media_type: MediaType) -> String {
        format!(
            "{}/{}/{}/external_ids",
            self.api_base,
            media_type.as_str(),
            urlencoding::encode(media_id)
        )
    }
}

#[async_trait]
impl CatalogLookup for TmdbCatalog {
    async fn external_id(&self, media_id: &str, media_type: MediaType, scheme: IdScheme) -> Result<String> {
        if scheme == IdScheme::Tmdb {
            return Ok(media_id.to_string());
        }

        let url = self.external_ids_url(media_id, media_type);
        log_debug!("Catalog", "查询外部ID: {}", url);

        let ids: ExternalIds = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        ids.imdb_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::Lookup(format!("no imdb id for {} {}", media_type.as_str(), media_id)))
    }
}
