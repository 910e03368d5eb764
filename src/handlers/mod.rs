mod proxy;
mod response;
mod serverless;
mod stream;

pub use proxy::ProxyHandler;
pub use response::ResponseBuilder;
pub use serverless::ServerlessHandler;
pub use stream::StreamHandler;

use std::collections::HashMap;

use crate::utils::error::{ProxyError, Result};

/// 解码后的查询参数，同名参数取第一个
#[derive(Debug, Default)]
pub struct Query(HashMap<String, String>);

impl Query {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut params = HashMap::new();
        if let Some(raw) = raw {
            for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
                params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
            }
        }
        Self(params)
    }

    /// 空白值视为未提供
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ProxyError::InvalidRequest(format!("missing parameter: {}", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_decoding() {
        let query = Query::parse(Some("url=https%3A%2F%2Fh%2Fa.m3u8&referer=&x=1&x=2&sp=a+b"));
        assert_eq!(query.get("url"), Some("https://h/a.m3u8"));
        assert_eq!(query.get("referer"), None);
        assert_eq!(query.get("x"), Some("1"));
        assert_eq!(query.get("sp"), Some("a b"));
        assert!(matches!(query.required("missing"), Err(ProxyError::InvalidRequest(_))));
        assert!(Query::parse(None).get("url").is_none());
    }
}
