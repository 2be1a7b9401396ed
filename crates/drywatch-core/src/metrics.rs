use chrono::{DateTime, Utc};
use drywatch_types::{Reading, SessionId};
use serde::Serialize;

use crate::aggregator::Session;

/// 两个时间点之间的整分钟数（向下取整）
///
/// 到达顺序与时间顺序不一致时可能为负，这里不做截断
pub fn elapsed_minutes(first: DateTime<Utc>, last: DateTime<Utc>) -> i64 {
    (last - first).num_milliseconds().div_euclid(60_000)
}

/// 以 "X hour Y minute" 形式显示时长
pub fn format_duration(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.unsigned_abs();
    format!("{}{} hour {} minute", sign, minutes / 60, minutes % 60)
}

/// 会话派生指标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetrics {
    pub session_id: SessionId,

    /// 第一条读数时间
    pub started_at: DateTime<Utc>,

    /// 最新读数（按到达顺序）
    pub latest: Reading,

    /// 已用时间（分钟）
    pub elapsed_minutes: i64,

    /// 最新内外温差
    pub diff_temp: f64,

    /// 最新内外湿度差
    pub diff_hum: f64,

    /// 从开始到现在箱内湿度下降值
    pub humidity_drop: f64,
}

impl SessionMetrics {
    pub fn derive(session: &Session) -> Self {
        let first = session.first();
        let latest = session.latest();

        Self {
            session_id: session.id(),
            started_at: first.timestamp,
            latest: latest.clone(),
            elapsed_minutes: elapsed_minutes(first.timestamp, latest.timestamp),
            diff_temp: latest.diff_temp,
            diff_hum: latest.diff_hum,
            humidity_drop: first.hum_in - latest.hum_in,
        }
    }

    pub fn duration_label(&self) -> String {
        format_duration(self.elapsed_minutes)
    }
}
