use chrono::{DateTime, Utc};
use drywatch_types::{DeviceStatusReport, SessionId, SessionPhase, SessionStatusReport};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DryError, Result};

/// 轮询目标
///
/// 每次切换目标都会生成新的 generation，旧目标的响应据此判定为过期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTarget {
    pub generation: u64,
    pub session_id: Option<SessionId>,
}

/// 一次轮询的原始结果
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSample {
    pub device: Result<DeviceStatusReport>,
    /// 没有选中会话时为 None
    pub session: Option<Result<SessionStatusReport>>,
    pub polled_at: DateTime<Utc>,
}

/// 带目标标记的轮询结果
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub target: PollTarget,
    pub sample: StatusSample,
}

/// 会话级状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub phase: SessionPhase,
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// 实时状态（None 表示未知）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusState {
    /// 设备是否在工作
    pub is_working: Option<bool>,

    /// 设备最近上报的会话
    pub latest_session_id: Option<SessionId>,

    /// 设备最近上报时间
    pub device_last_timestamp: Option<DateTime<Utc>>,

    /// 当前选中会话的状态
    pub session: Option<SessionStatus>,

    /// 最近一次轮询时间
    pub last_polled_at: Option<DateTime<Utc>>,

    /// 最近一次轮询是否有部分失败
    pub degraded: bool,
}

/// 状态变化，用于生成通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    DeviceStopped,
    DeviceResumed,
    SessionCompleted(SessionId),
}

/// 状态跟踪器
///
/// 持有当前轮询目标和最近一次的状态，只接受当前目标的响应
pub struct StatusTracker {
    generation: u64,
    target: Option<PollTarget>,
    state: StatusState,
    /// 最近一次成功获取的设备状态，轮询失败时保留
    last_known_working: Option<bool>,
    /// 最近一次成功获取的会话阶段
    last_known_phase: Option<(SessionId, SessionPhase)>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            generation: 0,
            target: None,
            state: StatusState::default(),
            last_known_working: None,
            last_known_phase: None,
        }
    }

    /// 切换轮询目标
    pub fn retarget(&mut self, session_id: Option<SessionId>) -> PollTarget {
        self.generation += 1;
        let target = PollTarget {
            generation: self.generation,
            session_id,
        };
        self.target = Some(target);

        let same_session = self
            .state
            .session
            .as_ref()
            .map(|s| Some(s.session_id) == session_id)
            .unwrap_or(false);
        if !same_session {
            self.state.session = None;
        }
        if self.last_known_phase.map(|(id, _)| Some(id)) != Some(session_id) {
            self.last_known_phase = None;
        }

        debug!(generation = target.generation, session_id = ?session_id, "Status target changed");
        target
    }

    /// 停止接受任何在途响应
    pub fn detach(&mut self) {
        self.generation += 1;
        self.target = None;
    }

    pub fn target(&self) -> Option<PollTarget> {
        self.target
    }

    pub fn state(&self) -> &StatusState {
        &self.state
    }

    /// 应用一次轮询结果
    ///
    /// 失败的部分降级为未知，不会中断后续轮询
    ///
    /// # 错误
    /// * `StaleResponse` - 响应属于旧目标
    pub fn apply(&mut self, update: StatusUpdate) -> Result<Vec<StatusTransition>> {
        if self.target != Some(update.target) {
            debug!(
                generation = update.target.generation,
                session_id = ?update.target.session_id,
                "Discarding stale status response"
            );
            return Err(DryError::StaleResponse {
                session_id: update.target.session_id,
                seq: update.target.generation,
            });
        }

        let mut transitions = Vec::new();
        let mut degraded = false;
        let StatusSample {
            device,
            session,
            polled_at,
        } = update.sample;

        match device {
            Ok(report) => {
                match (self.last_known_working, report.is_working) {
                    (Some(true), false) => transitions.push(StatusTransition::DeviceStopped),
                    (Some(false), true) => transitions.push(StatusTransition::DeviceResumed),
                    _ => {}
                }
                self.state.is_working = Some(report.is_working);
                self.last_known_working = Some(report.is_working);
                self.state.latest_session_id = report.latest_test_id;
                self.state.device_last_timestamp = report.last_timestamp;
            }
            Err(e) => {
                warn!(error = %e, "Device status poll failed");
                self.state.is_working = None;
                degraded = true;
            }
        }

        match (update.target.session_id, session) {
            (Some(session_id), Some(Ok(report))) => {
                let previous = self
                    .last_known_phase
                    .filter(|(id, _)| *id == session_id)
                    .map(|(_, phase)| phase);
                if previous == Some(SessionPhase::InProgress)
                    && report.status == SessionPhase::Completed
                {
                    info!(session_id, "Drying session completed");
                    transitions.push(StatusTransition::SessionCompleted(session_id));
                }
                self.last_known_phase = Some((session_id, report.status));
                self.state.session = Some(SessionStatus {
                    session_id,
                    phase: report.status,
                    last_timestamp: report.last_timestamp,
                });
            }
            (Some(session_id), Some(Err(e))) => {
                warn!(session_id, error = %e, "Session status poll failed");
                self.state.session = None;
                degraded = true;
            }
            _ => {
                self.state.session = None;
            }
        }

        self.state.last_polled_at = Some(polled_at);
        self.state.degraded = degraded;
        Ok(transitions)
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
