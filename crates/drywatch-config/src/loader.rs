use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

use crate::DashboardConfig;

/// 配置文件名
pub const CONFIG_FILE: &str = "drywatch.toml";

/// 环境变量前缀，例如 `DRYWATCH__POLLING__STATUS_POLL_MS`
pub const ENV_PREFIX: &str = "DRYWATCH";

/// 配置加载器
pub struct ConfigLoader {
    config_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// 创建配置加载器
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// 加载配置
    ///
    /// 配置文件不存在时使用默认值，环境变量覆盖文件中的值
    pub fn load(&self) -> Result<DashboardConfig> {
        let config_path = self.config_path();
        let mut builder = Config::builder();

        if config_path.exists() {
            builder = builder.add_source(File::new(
                config_path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 加载并验证配置
    pub fn load_validated(&self) -> Result<DashboardConfig> {
        let config = self.load()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(config: &DashboardConfig) -> Result<()> {
        let base_url = &config.api.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(anyhow!("api.base_url must be an http(s) URL: {}", base_url));
        }

        if config.api.timeout_ms == 0 {
            return Err(anyhow!("api.timeout_ms must be greater than 0"));
        }

        if config.polling.history_refresh_ms == 0 {
            return Err(anyhow!("polling.history_refresh_ms must be greater than 0"));
        }

        if config.polling.status_poll_ms == 0 {
            return Err(anyhow!("polling.status_poll_ms must be greater than 0"));
        }

        if config.notifications.capacity == 0 {
            return Err(anyhow!("notifications.capacity must be greater than 0"));
        }

        Ok(())
    }

    /// 以 TOML 输出配置
    pub fn render(config: &DashboardConfig) -> Result<String> {
        Ok(toml::to_string_pretty(config)?)
    }
}
