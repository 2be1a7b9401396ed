pub mod global;
pub mod loader;

pub use global::{
    ApiConfig, DashboardConfig, LogFormat, LoggingConfig, NotificationConfig, PollingConfig,
};
pub use loader::ConfigLoader;
