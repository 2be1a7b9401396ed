use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use drywatch_types::{Reading, SessionId, Snapshot};

use crate::error::{DryError, Result};

/// 干燥会话
///
/// 同一 `session_id` 下按到达顺序排列的读数，至少包含一条
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    readings: Vec<Reading>,
}

impl Session {
    /// 从读数列表构造会话
    ///
    /// # 错误
    /// * `EmptySession` - 读数列表为空
    pub fn try_from_readings(id: SessionId, readings: Vec<Reading>) -> Result<Self> {
        if readings.is_empty() {
            return Err(DryError::EmptySession(id));
        }
        debug_assert!(readings.iter().all(|r| r.session_id == id));
        Ok(Self { id, readings })
    }

    fn start(first: Reading) -> Self {
        Self {
            id: first.session_id,
            readings: vec![first],
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// 按到达顺序的全部读数（图表时间序列）
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// 到达顺序的第一条读数
    pub fn first(&self) -> &Reading {
        &self.readings[0]
    }

    /// 到达顺序的最后一条读数，不一定是时间戳最大的一条
    pub fn latest(&self) -> &Reading {
        &self.readings[self.readings.len() - 1]
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.first().timestamp
    }

    pub fn snapshot(&self) -> Snapshot {
        self.latest().snapshot()
    }
}

/// 按会话 ID 排序的会话映射
pub type SessionMap = BTreeMap<SessionId, Session>;

/// 将读数按会话分组
///
/// 保留每个会话内的到达顺序，不按时间戳排序；纯函数，可在每次刷新时重复调用
pub fn group(readings: &[Reading]) -> SessionMap {
    let mut sessions = SessionMap::new();
    for reading in readings {
        sessions
            .entry(reading.session_id)
            .and_modify(|session: &mut Session| session.readings.push(reading.clone()))
            .or_insert_with(|| Session::start(reading.clone()));
    }
    sessions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn reading(session_id: SessionId, minute: i64, hum_in: f64) -> Reading {
        let base = Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap();
        Reading::new(session_id, base + Duration::minutes(minute)).with_humidity(hum_in, 50.0)
    }

    #[test]
    fn test_group_empty() {
        assert!(group(&[]).is_empty());
    }

    #[test]
    fn test_group_partitions_by_session() {
        let input = vec![
            reading(2, 0, 90.0),
            reading(1, 0, 80.0),
            reading(2, 5, 85.0),
            reading(1, 10, 60.0),
            reading(3, 0, 70.0),
        ];

        let sessions = group(&input);
        assert_eq!(sessions.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

        let total: usize = sessions.values().map(Session::len).sum();
        assert_eq!(total, input.len());

        for session in sessions.values() {
            let expected: Vec<&Reading> =
                input.iter().filter(|r| r.session_id == session.id()).collect();
            let actual: Vec<&Reading> = session.readings().iter().collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_group_keeps_arrival_order() {
        // 到达顺序与时间顺序不一致
        let input = vec![reading(1, 10, 60.0), reading(1, 0, 80.0)];

        let sessions = group(&input);
        let session = &sessions[&1];
        assert_eq!(session.first().hum_in, 60.0);
        assert_eq!(session.latest().hum_in, 80.0);
        assert_eq!(session.started_at(), input[0].timestamp);
    }

    #[test]
    fn test_group_is_deterministic() {
        let input = vec![reading(1, 0, 80.0), reading(2, 0, 90.0), reading(1, 1, 79.0)];
        assert_eq!(group(&input), group(&input));
    }

    #[test]
    fn test_empty_session_rejected() {
        let result = Session::try_from_readings(7, Vec::new());
        assert_eq!(result.unwrap_err(), DryError::EmptySession(7));

        let session = Session::try_from_readings(7, vec![reading(7, 0, 75.0)]).unwrap();
        assert_eq!(session.snapshot().hum_in, 75.0);
    }
}
