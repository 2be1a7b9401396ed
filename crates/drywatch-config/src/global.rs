use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 看板全局配置
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

/// 后端接口配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,

    /// 全部读数
    pub history_path: String,

    /// 设备状态
    pub device_status_path: String,

    /// 会话状态（参数 `test_id`）
    pub session_status_path: String,

    /// 完成时间预测（参数为最新快照）
    pub estimate_path: String,

    /// 单次请求超时（毫秒）
    pub timeout_ms: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 轮询配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// 历史数据刷新间隔（毫秒）
    pub history_refresh_ms: u64,

    /// 实时状态轮询间隔（毫秒）
    pub status_poll_ms: u64,
}

impl PollingConfig {
    pub fn history_refresh(&self) -> Duration {
        Duration::from_millis(self.history_refresh_ms)
    }

    pub fn status_poll(&self) -> Duration {
        Duration::from_millis(self.status_poll_ms)
    }
}

/// 通知配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// 保留的最新通知条数
    pub capacity: usize,
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

// 默认值函数
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_history_refresh_ms() -> u64 {
    60_000
}

fn default_status_poll_ms() -> u64 {
    10_000
}

fn default_notification_capacity() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default trait 实现
impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            history_path: "/api/timetodry".to_string(),
            device_status_path: "/api/ttd/status".to_string(),
            session_status_path: "/api/ttd/status/check".to_string(),
            estimate_path: "/api/drytime/estimate".to_string(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            history_refresh_ms: default_history_refresh_ms(),
            status_poll_ms: default_status_poll_ms(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            capacity: default_notification_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}
