use drywatch_types::{SessionId, Snapshot};
use tracing::{debug, info, warn};

use crate::error::{DryError, Result};

/// 完成百分比，结果在 [0, 100]
///
/// 预测时长缺失或不大于 0 时为 0；负的已用时间按 0 处理
pub fn percent_complete(elapsed_minutes: i64, estimated_minutes: Option<f64>) -> u8 {
    let estimated = match estimated_minutes {
        Some(minutes) if minutes.is_finite() && minutes > 0.0 => minutes,
        _ => return 0,
    };

    let ratio = 100.0 * elapsed_minutes.max(0) as f64 / estimated;
    ratio.round().clamp(0.0, 100.0) as u8
}

/// 一次已发出的预测请求
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRequest {
    /// 单调递增的请求序号
    pub seq: u64,
    pub session_id: SessionId,
    pub snapshot: Snapshot,
}

/// 预测状态
#[derive(Debug, Clone, PartialEq)]
pub enum EstimateState {
    /// 尚未请求
    Absent,
    /// 已请求，等待结果（失败后也停留在此状态）
    Pending(EstimateRequest),
    /// 已有结果
    Ready {
        request: EstimateRequest,
        minutes: f64,
    },
}

/// 完成时间预测器
///
/// 只接受最后发出的请求的结果，先发后到的旧响应会被丢弃
pub struct CompletionEstimator {
    next_seq: u64,
    state: EstimateState,
}

impl CompletionEstimator {
    pub fn new() -> Self {
        Self {
            next_seq: 1,
            state: EstimateState::Absent,
        }
    }

    /// 登记一次新的预测请求，之前的结果随即失效
    pub fn issue(&mut self, session_id: SessionId, snapshot: Snapshot) -> EstimateRequest {
        let request = EstimateRequest {
            seq: self.next_seq,
            session_id,
            snapshot,
        };
        self.next_seq += 1;
        self.state = EstimateState::Pending(request.clone());

        debug!(session_id, seq = request.seq, "Estimate requested");
        request
    }

    /// 应用预测结果
    ///
    /// # 错误
    /// * `StaleResponse` - 已有更新的请求，结果被丢弃
    /// * `Estimator` - 请求失败或结果无效，状态保持 Pending
    pub fn resolve(&mut self, request: &EstimateRequest, result: Result<f64>) -> Result<f64> {
        if self.latest_request() != Some(request) {
            debug!(
                session_id = request.session_id,
                seq = request.seq,
                "Discarding stale estimate response"
            );
            return Err(DryError::StaleResponse {
                session_id: Some(request.session_id),
                seq: request.seq,
            });
        }

        let minutes = match result {
            Ok(minutes) if minutes.is_finite() => minutes,
            Ok(minutes) => {
                let err = DryError::estimator(format!("invalid estimate: {}", minutes));
                warn!(session_id = request.session_id, error = %err, "Estimate rejected");
                return Err(err);
            }
            Err(err) => {
                warn!(session_id = request.session_id, error = %err, "Estimate request failed");
                return Err(match err {
                    DryError::Estimator(_) => err,
                    other => DryError::estimator(other.to_string()),
                });
            }
        };

        info!(
            session_id = request.session_id,
            seq = request.seq,
            estimated_minutes = minutes,
            "Estimate updated"
        );
        self.state = EstimateState::Ready {
            request: request.clone(),
            minutes,
        };
        Ok(minutes)
    }

    /// 清空预测状态，在途请求的结果都会被视为过期
    pub fn reset(&mut self) {
        self.state = EstimateState::Absent;
    }

    pub fn state(&self) -> &EstimateState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, EstimateState::Pending(_))
    }

    pub fn estimated_minutes(&self) -> Option<f64> {
        match &self.state {
            EstimateState::Ready { minutes, .. } => Some(*minutes),
            _ => None,
        }
    }

    pub fn percent_complete(&self, elapsed_minutes: i64) -> u8 {
        percent_complete(elapsed_minutes, self.estimated_minutes())
    }

    fn latest_request(&self) -> Option<&EstimateRequest> {
        match &self.state {
            EstimateState::Absent => None,
            EstimateState::Pending(request) => Some(request),
            EstimateState::Ready { request, .. } => Some(request),
        }
    }
}

impl Default for CompletionEstimator {
    fn default() -> Self {
        Self::new()
    }
}
