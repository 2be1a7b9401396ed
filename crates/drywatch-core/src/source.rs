use async_trait::async_trait;
use drywatch_types::{DeviceStatusReport, Reading, SessionId, SessionStatusReport, Snapshot};

use crate::error::Result;

/// 历史读数来源
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// 拉取全部会话的读数（按接口返回顺序）
    async fn fetch_history(&self) -> Result<Vec<Reading>>;
}

/// 设备/会话状态来源
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// 设备级状态
    async fn device_status(&self) -> Result<DeviceStatusReport>;

    /// 指定会话的状态
    async fn session_status(&self, session_id: SessionId) -> Result<SessionStatusReport>;
}

/// 完成时间预测来源
#[async_trait]
pub trait EstimatorSource: Send + Sync {
    /// 根据快照预测总干燥时长（分钟）
    async fn estimate(&self, snapshot: &Snapshot) -> Result<f64>;
}
