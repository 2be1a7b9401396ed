use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::reading::{parse_timestamp, SessionId};

fn optional_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// 设备状态接口响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatusReport {
    /// 设备最近是否仍在上报数据
    pub is_working: bool,

    #[serde(default)]
    pub latest_test_id: Option<SessionId>,

    #[serde(default, deserialize_with = "optional_timestamp")]
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// 仍在采集
    #[serde(alias = "in_process")]
    InProgress,
    /// 已完成
    Completed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::InProgress => "in_progress",
            SessionPhase::Completed => "completed",
        }
    }
}

/// 会话状态接口响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusReport {
    #[serde(default)]
    pub test_id: Option<SessionId>,

    pub status: SessionPhase,

    #[serde(default, deserialize_with = "optional_timestamp")]
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// 完成时间预测接口响应
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimateReport {
    pub estimated_drying_time_minutes: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_status_minimal() {
        let report: DeviceStatusReport =
            serde_json::from_value(json!({ "is_working": true })).unwrap();
        assert!(report.is_working);
        assert_eq!(report.latest_test_id, None);
        assert_eq!(report.last_timestamp, None);
    }

    #[test]
    fn test_session_status_aliases() {
        let report: SessionStatusReport = serde_json::from_value(json!({
            "test_id": 4,
            "status": "in_process",
            "last_timestamp": "2025-04-01 10:00:00"
        }))
        .unwrap();
        assert_eq!(report.status, SessionPhase::InProgress);
        assert!(report.last_timestamp.is_some());

        let report: SessionStatusReport =
            serde_json::from_value(json!({ "status": "completed" })).unwrap();
        assert_eq!(report.status, SessionPhase::Completed);
        assert_eq!(report.status.as_str(), "completed");
    }

    #[test]
    fn test_unknown_phase_is_rejected() {
        let result: Result<SessionStatusReport, _> =
            serde_json::from_value(json!({ "status": "paused" }));
        assert!(result.is_err());
    }
}
