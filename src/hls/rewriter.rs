use lazy_static::lazy_static;
use regex::{Captures, Regex};
use url::Url;

use crate::log_warn;
use crate::utils::error::{ProxyError, Result};
use crate::utils::UrlUtils;

lazy_static! {
    static ref URI_ATTRIBUTE: Regex = Regex::new(r#"URI="([^"]*)""#).unwrap();
}

const URI_SCOPED_TAGS: [&str; 3] = ["#EXTINF", "#EXT-X-BYTERANGE", "#EXT-X-STREAM-INF"];

/// 按行改写 m3u8，所有媒体地址都指向代理前缀
///
/// # Examples
/// ```
/// use stream_proxy::hls::rewrite_manifest;
///
/// let out = rewrite_manifest("#EXTM3U\nseg1.ts\n", "https://host/a/index.m3u8", "/hls/proxy?url=").unwrap();
/// assert_eq!(out, "#EXTM3U\n/hls/proxy?url=https%3A%2F%2Fhost%2Fa%2Fseg1.ts\n");
/// ```
pub fn rewrite_manifest(content: &str, base_url: &str, proxy_prefix: &str) -> Result<String> {
    rewrite_manifest_with(content, base_url, |absolute| {
        UrlUtils::to_proxy_url(proxy_prefix, absolute)
    })
}

/// 同 [`rewrite_manifest`]，但由调用方决定每个绝对地址对应的代理地址
pub fn rewrite_manifest_with<F>(content: &str, base_url: &str, to_proxy: F) -> Result<String>
where
    F: Fn(&str) -> String,
{
    let base = Url::parse(base_url)
        .map_err(|e| ProxyError::Parse(format!("无法解析基础URL {}: {}", base_url, e)))?;

    let mut lines: Vec<String> = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            lines.push(line.to_string());
        } else if trimmed.starts_with('#') {
            lines.push(rewrite_tag(trimmed, &base, &to_proxy));
        } else {
            match resolve(&base, trimmed) {
                Some(absolute) => lines.push(proxy_or_keep(&absolute, &to_proxy)),
                None => {
                    log_warn!("HLS", "无法解析分片地址，已丢弃: {}", trimmed);
                    drop_dangling_tags(&mut lines);
                }
            }
        }
    }

    let mut result = String::with_capacity(content.len() * 2);
    for line in &lines {
        result.push_str(line);
        result.push('\n');
    }
    Ok(result)
}

/// 丢弃地址行时一并去掉只作用于它的标签
fn drop_dangling_tags(lines: &mut Vec<String>) {
    while lines
        .last()
        .is_some_and(|last| URI_SCOPED_TAGS.iter().any(|tag| last.starts_with(tag)))
    {
        lines.pop();
    }
}

fn rewrite_tag<F>(line: &str, base: &Url, to_proxy: &F) -> String
where
    F: Fn(&str) -> String,
{
    if !line.contains("URI=\"") {
        return line.to_string();
    }

    URI_ATTRIBUTE
        .replace_all(line, |caps: &Captures| {
            // 空地址原样保留，否则会解析成播放列表自身
            if caps[1].trim().is_empty() {
                return caps[0].to_string();
            }
            match resolve(base, &caps[1]) {
                Some(absolute) => format!("URI=\"{}\"", proxy_or_keep(&absolute, to_proxy)),
                None => {
                    log_warn!("HLS", "无法解析 URI 属性，已清空: {}", &caps[1]);
                    "URI=\"\"".to_string()
                }
            }
        })
        .into_owned()
}

fn resolve(base: &Url, reference: &str) -> Option<String> {
    base.join(reference.trim()).ok().map(|u| u.to_string())
}

/// 只代理 http(s)，data:/skd: 之类的地址不指向第三方主机，原样保留
fn proxy_or_keep<F>(absolute: &str, to_proxy: &F) -> String
where
    F: Fn(&str) -> String,
{
    if UrlUtils::is_absolute_url(absolute) {
        to_proxy(absolute)
    } else {
        absolute.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://host/a/index.m3u8";
    const PREFIX: &str = "/hls/proxy?url=";

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:4
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",NAME=\"English\",URI=\"audio/en.m3u8\"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID=\"subs\",NAME=\"English\",URI=\"https://subs.cdn.net/en.m3u8\"
#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720,AUDIO=\"aud\"
720p/index.m3u8

#EXT-X-STREAM-INF:BANDWIDTH=2560000,RESOLUTION=1920x1080,AUDIO=\"aud\"
/abs/1080p/index.m3u8
";

    const MEDIA: &str = "#EXTM3U
#EXT-X-TARGETDURATION:6
#EXT-X-KEY:METHOD=AES-128,URI=\"../keys/k1.bin\",IV=0x1234
#EXT-X-MAP:URI=\"init.mp4\"
#EXTINF:6.0,
segment1.ts
#EXTINF:6.0,
http://other.cdn.com/segment2.ts?sig=abc
#EXT-X-ENDLIST
";

    #[test]
    fn test_end_to_end_example() {
        let manifest = "#EXTM3U\n#EXT-X-MEDIA:TYPE=AUDIO,URI=\"audio/en.m3u8\"\nsegment1.ts\n";
        let out = rewrite_manifest(manifest, BASE, PREFIX).unwrap();

        assert!(out.contains("/hls/proxy?url=https%3A%2F%2Fhost%2Fa%2Fsegment1.ts"));
        assert!(out.contains("URI=\"/hls/proxy?url=https%3A%2F%2Fhost%2Fa%2Faudio%2Fen.m3u8\""));
    }

    #[test]
    fn test_no_third_party_url_survives() {
        for manifest in [MASTER, MEDIA] {
            let out = rewrite_manifest(manifest, BASE, PREFIX).unwrap();
            assert!(!out.contains("https://"), "{}", out);
            assert!(!out.contains("http://"), "{}", out);
        }
    }

    #[test]
    fn test_tags_and_blank_lines_preserved() {
        let out = rewrite_manifest(MASTER, BASE, PREFIX).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXT-X-VERSION:4");
        assert_eq!(
            lines[4],
            "#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720,AUDIO=\"aud\""
        );
        assert_eq!(lines[6], "");
        assert_eq!(lines.len(), MASTER.lines().count());
    }

    #[test]
    fn test_media_playlist_references() {
        let out = rewrite_manifest(MEDIA, BASE, PREFIX).unwrap();

        assert!(out.contains("URI=\"/hls/proxy?url=https%3A%2F%2Fhost%2Fkeys%2Fk1.bin\",IV=0x1234"));
        assert!(out.contains("#EXT-X-MAP:URI=\"/hls/proxy?url=https%3A%2F%2Fhost%2Fa%2Finit.mp4\""));
        assert!(out.contains("/hls/proxy?url=http%3A%2F%2Fother.cdn.com%2Fsegment2.ts%3Fsig%3Dabc"));
        assert!(out.contains("#EXTINF:6.0,\n"));
        assert!(out.ends_with("#EXT-X-ENDLIST\n"));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let first = rewrite_manifest(MEDIA, BASE, PREFIX).unwrap();
        let second = rewrite_manifest(MEDIA, BASE, PREFIX).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_relative_line_round_trip() {
        let out = rewrite_manifest("#EXTM3U\n../b/seg 7.ts\n", BASE, PREFIX).unwrap();
        let line = out.lines().nth(1).unwrap();
        let decoded = UrlUtils::strip_proxy_prefix(line, PREFIX).unwrap();

        assert_eq!(decoded, UrlUtils::resolve(BASE, "../b/seg 7.ts").unwrap());
        assert_eq!(decoded, "https://host/b/seg%207.ts");
    }

    #[test]
    fn test_crlf_normalized() {
        let out = rewrite_manifest("#EXTM3U\r\nsegment1.ts\r\n", BASE, PREFIX).unwrap();
        assert_eq!(out, "#EXTM3U\n/hls/proxy?url=https%3A%2F%2Fhost%2Fa%2Fsegment1.ts\n");
    }

    #[test]
    fn test_non_http_uri_kept() {
        let manifest = "#EXT-X-KEY:METHOD=SAMPLE-AES,URI=\"skd://key-id\"\n";
        let out = rewrite_manifest(manifest, BASE, PREFIX).unwrap();
        assert_eq!(out, manifest);
    }

    #[test]
    fn test_custom_proxy_mapping() {
        let out = rewrite_manifest_with("#EXTM3U\nsegment1.ts\n720p.m3u8\n", BASE, |abs| {
            let kind = if abs.ends_with(".m3u8") { "manifest" } else { "segment" };
            format!("/api/hls-proxy?type={}&url={}", kind, urlencoding::encode(abs))
        })
        .unwrap();

        assert!(out.contains("/api/hls-proxy?type=segment&url=https%3A%2F%2Fhost%2Fa%2Fsegment1.ts"));
        assert!(out.contains("/api/hls-proxy?type=manifest&url=https%3A%2F%2Fhost%2Fa%2F720p.m3u8"));
    }

    #[test]
    fn test_empty_uri_attribute_left_alone() {
        let manifest = "#EXT-X-KEY:METHOD=NONE,URI=\"\"\n";
        let out = rewrite_manifest(manifest, BASE, PREFIX).unwrap();
        assert_eq!(out, manifest);
    }

    #[test]
    fn test_unresolvable_line_drops_its_tags() {
        let manifest = "#EXTM3U\n#EXTINF:6.0,\nsegment1.ts\n#EXTINF:6.0,\n#EXT-X-BYTERANGE:100@0\nhttp://[bad\n#EXTINF:6.0,\nsegment3.ts\n#EXT-X-ENDLIST\n";
        let out = rewrite_manifest(manifest, BASE, PREFIX).unwrap();

        assert_eq!(
            out,
            "#EXTM3U\n\
#EXTINF:6.0,\n\
/hls/proxy?url=https%3A%2F%2Fhost%2Fa%2Fsegment1.ts\n\
#EXTINF:6.0,\n\
/hls/proxy?url=https%3A%2F%2Fhost%2Fa%2Fsegment3.ts\n\
#EXT-X-ENDLIST\n"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(rewrite_manifest("#EXTM3U\nseg.ts\n", "not-a-url", PREFIX).is_err());
    }
}
