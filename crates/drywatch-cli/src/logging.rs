use anyhow::Result;
use drywatch_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 选择日志过滤规则：命令行 > RUST_LOG > 配置文件
pub fn build_filter(config: &LoggingConfig, override_level: Option<&str>) -> EnvFilter {
    match override_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level)),
    }
}

/// 初始化日志
pub fn init(config: &LoggingConfig, override_level: Option<&str>) -> Result<()> {
    let filter = build_filter(config, override_level);

    match config.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }

    Ok(())
}
