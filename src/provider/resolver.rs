use super::{MediaRequest, ProviderContext, ProviderRegistry, StreamResult};
use crate::{log_debug, log_info, log_warn};

pub const NO_STREAM_FOUND: &str = "no stream found";

/// 按优先级依次尝试 provider，返回第一个成功的结果
pub struct StreamResolver {
    registry: ProviderRegistry,
    ctx: ProviderContext,
}

impl StreamResolver {
    pub fn new(registry: ProviderRegistry, ctx: ProviderContext) -> Self {
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// 永远不会返回错误，全部失败时返回 `success: false`
    pub async fn resolve(&self, request: &MediaRequest, preferred: Option<&str>) -> StreamResult {
        let candidates = self.registry.candidates(preferred);
        log_debug!(
            "Resolver",
            "解析 {} {} (S{:?}E{:?})，候选 {} 个",
            request.media_type.as_str(),
            request.media_id,
            request.season,
            request.episode,
            candidates.len()
        );

        // 顺序执行，不并发
        for descriptor in candidates {
            match descriptor.provider().get_stream(&self.ctx, request).await {
                Ok(result) => {
                    let result = result.normalize(&descriptor.name);
                    if result.success {
                        log_info!("Resolver", "{} 命中: {}", descriptor.name, request.media_id);
                        return result;
                    }
                    log_debug!(
                        "Resolver",
                        "{} 未找到: {}",
                        descriptor.name,
                        result.error.as_deref().unwrap_or("-")
                    );
                }
                Err(e) => {
                    log_warn!("Resolver", "{} 失败，跳过: {}", descriptor.name, e);
                }
            }
        }

        StreamResult::not_found(NO_STREAM_FOUND)
    }
}
