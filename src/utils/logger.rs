use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub struct Logger;

impl Logger {
    /// 初始化日志，优先使用 RUST_LOG，其次使用配置的级别
    pub fn init(level: &str, json: bool) {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let registry = tracing_subscriber::registry().with(env_filter);

        let result = if json {
            registry
                .with(fmt::layer().json().with_target(true).with_current_span(true))
                .try_init()
        } else {
            registry.with(fmt::layer().with_target(false)).try_init()
        };

        // 测试里可能重复初始化
        if let Err(e) = result {
            eprintln!("日志已初始化: {}", e);
        }
    }
}

#[macro_export]
macro_rules! log_info {
    ($module:expr, $($arg:tt)*) => ({
        ::tracing::info!(module = $module, $($arg)*)
    })
}

#[macro_export]
macro_rules! log_warn {
    ($module:expr, $($arg:tt)*) => ({
        ::tracing::warn!(module = $module, $($arg)*)
    })
}

#[macro_export]
macro_rules! log_error {
    ($module:expr, $($arg:tt)*) => ({
        ::tracing::error!(module = $module, $($arg)*)
    })
}

#[macro_export]
macro_rules! log_debug {
    ($module:expr, $($arg:tt)*) => ({
        ::tracing::debug!(module = $module, $($arg)*)
    })
}
