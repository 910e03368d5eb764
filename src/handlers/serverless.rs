use crate::cache::FileKind;
use crate::hls::ProxiedBody;
use crate::server::AppState;
use crate::utils::error::{ProxyError, Result};

use super::Query;

/// `GET /api/hls-proxy?type=manifest|segment&url=..[&referer=..]`
///
/// 无状态版本：不读写任何缓存，每次都直接请求上游。
pub struct ServerlessHandler;

impl ServerlessHandler {
    pub async fn handle(state: &AppState, query: &Query) -> Result<ProxiedBody> {
        let manifest = match query.required("type")? {
            "manifest" => true,
            "segment" => false,
            other => {
                return Err(ProxyError::InvalidRequest(format!("invalid type: {}", other)));
            }
        };
        let url = query.required("url")?;
        let referer = query.get("referer");

        let endpoint = state.serverless_endpoint();
        state
            .hls
            .proxy_stateless(url, manifest, referer, |absolute| {
                serverless_url(&endpoint, absolute, referer)
            })
            .await
    }
}

/// 嵌套的 `.m3u8` 改写为 `type=manifest`，其余都按分片处理
pub fn serverless_url(endpoint: &str, absolute_url: &str, referer: Option<&str>) -> String {
    let kind = match FileKind::from_url(absolute_url) {
        FileKind::Manifest => "manifest",
        _ => "segment",
    };

    let mut out = format!("{}?type={}", endpoint, kind);
    if let Some(referer) = referer {
        out.push_str("&referer=");
        out.push_str(&urlencoding::encode(referer));
    }
    out.push_str("&url=");
    out.push_str(&urlencoding::encode(absolute_url));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serverless_url_kinds() {
        assert_eq!(
            serverless_url("/api/hls-proxy", "https://h/a/720p.m3u8", None),
            "/api/hls-proxy?type=manifest&url=https%3A%2F%2Fh%2Fa%2F720p.m3u8"
        );
        assert_eq!(
            serverless_url("/api/hls-proxy", "https://h/a/key.bin", Some("https://e.test/")),
            "/api/hls-proxy?type=segment&referer=https%3A%2F%2Fe.test%2F&url=https%3A%2F%2Fh%2Fa%2Fkey.bin"
        );
    }
}
