use url::Url;

use crate::utils::error::{ProxyError, Result};

pub struct UrlUtils;

impl UrlUtils {
    /// 将引用解析为绝对 URL，支持绝对路径、相对路径和协议相对路径
    ///
    /// # Examples
    /// ```
    /// use stream_proxy::utils::url::UrlUtils;
    ///
    /// let url = UrlUtils::resolve("https://host/a/index.m3u8", "seg1.ts").unwrap();
    /// assert_eq!(url, "https://host/a/seg1.ts");
    /// ```
    pub fn resolve(base_url: &str, reference: &str) -> Result<String> {
        let base = Url::parse(base_url)
            .map_err(|e| ProxyError::Parse(format!("无法解析URL {}: {}", base_url, e)))?;
        let joined = base
            .join(reference.trim())
            .map_err(|e| ProxyError::Parse(format!("无法拼接URL {}: {}", reference, e)))?;
        Ok(joined.to_string())
    }

    /// 生成代理 URL: 前缀 + 百分号编码后的绝对地址
    pub fn to_proxy_url(proxy_prefix: &str, absolute_url: &str) -> String {
        format!("{}{}", proxy_prefix, urlencoding::encode(absolute_url))
    }

    /// 代理入口的查询前缀，referer 放在 url 之前，使结果可以直接拼接编码后的地址
    ///
    /// # Examples
    /// ```
    /// use stream_proxy::utils::url::UrlUtils;
    ///
    /// assert_eq!(UrlUtils::proxy_prefix("/hls/proxy", None), "/hls/proxy?url=");
    /// assert_eq!(
    ///     UrlUtils::proxy_prefix("/hls/proxy", Some("https://e.com/")),
    ///     "/hls/proxy?referer=https%3A%2F%2Fe.com%2F&url="
    /// );
    /// ```
    pub fn proxy_prefix(endpoint: &str, referer: Option<&str>) -> String {
        match referer {
            Some(referer) => format!("{}?referer={}&url=", endpoint, urlencoding::encode(referer)),
            None => format!("{}?url=", endpoint),
        }
    }

    /// 去掉代理前缀并解码，得到原始地址
    ///
    /// # Examples
    /// ```
    /// use stream_proxy::utils::url::UrlUtils;
    ///
    /// let url = "/hls/proxy?url=https%3A%2F%2Fhost%2Fv.ts";
    /// let clean = UrlUtils::strip_proxy_prefix(url, "/hls/proxy?url=").unwrap();
    /// assert_eq!(clean, "https://host/v.ts");
    /// ```
    pub fn strip_proxy_prefix(url: &str, proxy_prefix: &str) -> Option<String> {
        let encoded = url.strip_prefix(proxy_prefix)?;
        urlencoding::decode(encoded).ok().map(|s| s.into_owned())
    }

    /// 判断是否是完整的 URL
    pub fn is_absolute_url(url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    /// 获取路径部分的小写扩展名，忽略查询参数和片段
    pub fn extension(url: &str) -> Option<String> {
        let path = match Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url
                .split(|c| c == '?' || c == '#')
                .next()
                .unwrap_or_default()
                .to_string(),
        };

        let file_name = path.rsplit('/').next()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// 提取 scheme://host[:port]，用作 Referer/Origin
    pub fn origin(url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        match parsed.origin() {
            url::Origin::Tuple(..) => Some(parsed.origin().ascii_serialization()),
            url::Origin::Opaque(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let cases = vec![
            ("https://host/a/index.m3u8", "seg.ts", "https://host/a/seg.ts"),
            ("https://host/a/index.m3u8", "/root/seg.ts", "https://host/root/seg.ts"),
            ("https://host/a/index.m3u8", "../b/seg.ts", "https://host/b/seg.ts"),
            ("https://host/a/index.m3u8", "//cdn.com/x.ts", "https://cdn.com/x.ts"),
            ("https://host/a/index.m3u8", "http://other.com/y.ts", "http://other.com/y.ts"),
            ("https://host/a/index.m3u8?token=1", "seg.ts?t=2", "https://host/a/seg.ts?t=2"),
        ];

        for (base, reference, expected) in cases {
            assert_eq!(UrlUtils::resolve(base, reference).unwrap(), expected);
        }
    }

    #[test]
    fn test_resolve_rejects_bad_base() {
        assert!(UrlUtils::resolve("not a url", "seg.ts").is_err());
    }

    #[test]
    fn test_proxy_url_round_trip() {
        let prefix = "/hls/proxy?url=";
        let original = "https://host/a/seg 1.ts?sig=a&b=c";
        let proxied = UrlUtils::to_proxy_url(prefix, original);
        assert!(!proxied.contains("https://"));
        assert_eq!(UrlUtils::strip_proxy_prefix(&proxied, prefix).unwrap(), original);
        assert_eq!(UrlUtils::strip_proxy_prefix("/other?url=x", prefix), None);
    }

    #[test]
    fn test_is_absolute_url() {
        assert!(UrlUtils::is_absolute_url("http://example.com"));
        assert!(UrlUtils::is_absolute_url("https://example.com"));
        assert!(!UrlUtils::is_absolute_url("/path/to/file"));
        assert!(!UrlUtils::is_absolute_url("relative/path"));
    }

    #[test]
    fn test_extension() {
        assert_eq!(UrlUtils::extension("https://h/a/index.M3U8?x=1").as_deref(), Some("m3u8"));
        assert_eq!(UrlUtils::extension("https://h/a/seg.ts#frag").as_deref(), Some("ts"));
        assert_eq!(UrlUtils::extension("https://h/a.b/seg").as_deref(), None);
        assert_eq!(UrlUtils::extension("https://h/").as_deref(), None);
        assert_eq!(UrlUtils::extension("relative/v.mp4?q").as_deref(), Some("mp4"));
    }

    #[test]
    fn test_origin() {
        assert_eq!(
            UrlUtils::origin("https://embed.example.com:8443/e/1").as_deref(),
            Some("https://embed.example.com:8443")
        );
        assert_eq!(UrlUtils::origin("nope"), None);
    }
}
