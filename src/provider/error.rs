use crate::utils::error::ProxyError;

/// 单个 provider 的失败，在 resolver 内部消化
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] ProxyError),

    #[error("Catalog lookup failed: {0}")]
    Lookup(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Lookup(err.to_string())
    }
}
