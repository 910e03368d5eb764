mod handler;
mod rewriter;

pub use handler::{HlsProxy, ProxiedBody, HLS_CONTENT_TYPE};
pub use rewriter::{rewrite_manifest, rewrite_manifest_with};

use m3u8_rs::Playlist;
use std::fmt;

/// 播放列表摘要，仅用于诊断日志
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistSummary {
    Master {
        variants: usize,
        alternatives: usize,
    },
    Media {
        segments: usize,
        target_duration: f32,
        /// 是否包含 #EXT-X-ENDLIST（点播）
        ended: bool,
    },
}

impl fmt::Display for PlaylistSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistSummary::Master {
                variants,
                alternatives,
            } => write!(f, "主播放列表: {} 个变体流, {} 个备选轨道", variants, alternatives),
            PlaylistSummary::Media {
                segments,
                target_duration,
                ended,
            } => write!(
                f,
                "媒体播放列表: {} 个分片, 目标时长 {}s, {}",
                segments,
                target_duration,
                if *ended { "点播" } else { "直播" }
            ),
        }
    }
}

/// 解析 m3u8 内容，无法解析时返回 None（仍然照常代理）
pub fn inspect_playlist(content: &str) -> Option<PlaylistSummary> {
    let (_, playlist) = m3u8_rs::parse_playlist(content.as_bytes()).ok()?;

    let summary = match playlist {
        Playlist::MasterPlaylist(master) => PlaylistSummary::Master {
            variants: master.variants.len(),
            alternatives: master.alternatives.len(),
        },
        Playlist::MediaPlaylist(media) => PlaylistSummary::Media {
            segments: media.segments.len(),
            target_duration: media.target_duration,
            ended: media.end_list,
        },
    };
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_master() {
        let content = "#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",NAME=\"English\",URI=\"audio/en.m3u8\"
#EXT-X-STREAM-INF:BANDWIDTH=1280000,AUDIO=\"aud\"
720p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2560000,AUDIO=\"aud\"
1080p/index.m3u8
";
        assert_eq!(
            inspect_playlist(content),
            Some(PlaylistSummary::Master {
                variants: 2,
                alternatives: 1
            })
        );
    }

    #[test]
    fn test_inspect_media() {
        let content = "#EXTM3U
#EXT-X-TARGETDURATION:6
#EXTINF:6.0,
seg1.ts
#EXTINF:5.5,
seg2.ts
#EXT-X-ENDLIST
";
        match inspect_playlist(content) {
            Some(PlaylistSummary::Media { segments, ended, .. }) => {
                assert_eq!(segments, 2);
                assert!(ended);
            }
            other => panic!("unexpected summary: {:?}", other),
        }
    }
}
