use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use super::{
    EmbedProvider, EmbedTemplate, IdScheme, ProviderError, Result, ScrapeProvider, StreamProvider,
};
use crate::log_info;

/// 抓取类 provider 的上限
#[derive(Debug, Clone, Copy)]
pub struct ScrapeLimits {
    /// 每个 provider 最多尝试的镜像数
    pub max_attempts: usize,
    /// 最多跟随的嵌套 iframe 层数
    pub max_depth: usize,
}

impl Default for ScrapeLimits {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_depth: 1,
        }
    }
}

/// providers.json 中的一项
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub key: String,
    pub name: String,
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub id_scheme: IdScheme,
    #[serde(flatten)]
    pub strategy: StrategyConfig,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// 直接拼接嵌入地址
    Embed { movie: String, tv: String },
    /// 抓取嵌入页，按顺序尝试各个镜像模板
    Scrape {
        movie: Vec<String>,
        tv: Vec<String>,
        #[serde(default)]
        referer: Option<String>,
    },
}

pub enum ProviderKind {
    Embed(EmbedProvider),
    Scrape(ScrapeProvider),
    /// 代码中注册的自定义实现
    Custom(Arc<dyn StreamProvider>),
}

pub struct ProviderDescriptor {
    pub key: String,
    pub name: String,
    /// 越小越先执行
    pub priority: i32,
    pub kind: ProviderKind,
}

impl ProviderDescriptor {
    pub fn provider(&self) -> &dyn StreamProvider {
        match &self.kind {
            ProviderKind::Embed(p) => p,
            ProviderKind::Scrape(p) => p,
            ProviderKind::Custom(p) => p.as_ref(),
        }
    }

    fn from_config(config: ProviderConfig, limits: ScrapeLimits) -> Result<Self> {
        let templates = |list: Vec<String>| -> Result<Vec<EmbedTemplate>> {
            list.into_iter().map(EmbedTemplate::new).collect()
        };

        let kind = match config.strategy {
            StrategyConfig::Embed { movie, tv } => ProviderKind::Embed(EmbedProvider::new(
                config.name.clone(),
                config.id_scheme,
                EmbedTemplate::new(movie)?,
                EmbedTemplate::new(tv)?,
            )),
            StrategyConfig::Scrape { movie, tv, referer } => {
                if movie.is_empty() && tv.is_empty() {
                    return Err(ProviderError::MissingField(format!("{}: templates", config.key)));
                }
                ProviderKind::Scrape(
                    ScrapeProvider::new(
                        config.name.clone(),
                        config.id_scheme,
                        templates(movie)?,
                        templates(tv)?,
                        referer,
                    )
                    .with_limits(limits.max_attempts, limits.max_depth),
                )
            }
        };

        Ok(Self {
            key: config.key,
            name: config.name,
            priority: config.priority,
            kind,
        })
    }
}

/// 按优先级排好序的 provider 列表，启动时加载一次
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: Vec<ProviderConfig>, limits: ScrapeLimits) -> Result<Self> {
        let mut registry = Self::new();
        for config in configs.into_iter().filter(|c| c.enabled) {
            registry.register(ProviderDescriptor::from_config(config, limits)?)?;
        }
        Ok(registry)
    }

    pub fn load_from_file(path: &Path, limits: ScrapeLimits) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let configs: Vec<ProviderConfig> = serde_json::from_str(&raw)?;
        let registry = Self::from_configs(configs, limits)?;
        log_info!("Provider", "从 {} 加载了 {} 个 provider", path.display(), registry.len());
        Ok(registry)
    }

    /// 注册后保持按优先级稳定排序
    pub fn register(&mut self, descriptor: ProviderDescriptor) -> Result<()> {
        if self.get(&descriptor.key).is_some() {
            return Err(ProviderError::InvalidConfig(format!(
                "duplicate provider key: {}",
                descriptor.key
            )));
        }
        self.providers.push(descriptor);
        self.providers.sort_by_key(|p| p.priority);
        Ok(())
    }

    pub fn register_custom(
        &mut self,
        key: &str,
        name: &str,
        priority: i32,
        provider: Arc<dyn StreamProvider>,
    ) -> Result<()> {
        self.register(ProviderDescriptor {
            key: key.to_string(),
            name: name.to_string(),
            priority,
            kind: ProviderKind::Custom(provider),
        })
    }

    pub fn get(&self, key: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.key == key)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.key.as_str()).collect()
    }

    /// 候选顺序：按优先级升序，指定的 provider 提到最前
    pub fn candidates(&self, preferred: Option<&str>) -> Vec<&ProviderDescriptor> {
        let mut ordered: Vec<&ProviderDescriptor> = self.providers.iter().collect();

        if let Some(key) = preferred {
            if let Some(pos) = ordered.iter().position(|p| p.key == key) {
                let chosen = ordered.remove(pos);
                ordered.insert(0, chosen);
            }
        }

        ordered
    }
}
