use crate::hls::ProxiedBody;
use crate::server::AppState;
use crate::utils::error::Result;
use crate::utils::UrlUtils;

use super::Query;

/// `GET /hls/proxy?url=..[&referer=..]`，走共享缓存
pub struct ProxyHandler;

impl ProxyHandler {
    pub async fn handle(state: &AppState, query: &Query) -> Result<ProxiedBody> {
        let url = query.required("url")?;
        let referer = query.get("referer");

        // 改写后的地址继续带上 referer，子请求才能通过上游的防盗链
        let prefix = UrlUtils::proxy_prefix(&state.proxy_endpoint(), referer);
        state
            .hls
            .proxy(url, referer, |absolute| UrlUtils::to_proxy_url(&prefix, absolute))
            .await
    }
}
