use drywatch_types::SessionId;
use thiserror::Error;

/// 干燥看板错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DryError {
    /// 历史数据或状态暂不可用（请求失败或仍在加载）
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// 完成时间预测失败或返回了无效数据
    #[error("Estimator error: {0}")]
    Estimator(String),

    /// 响应对应的选择/快照已被替换
    #[error("Stale response for session {session_id:?} (request #{seq})")]
    StaleResponse {
        session_id: Option<SessionId>,
        seq: u64,
    },

    /// 会话没有任何读数（违反会话不变量）
    #[error("Session {0} has no readings")]
    EmptySession(SessionId),

    /// 选择了不存在的会话
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),
}

/// 结果类型
pub type Result<T> = std::result::Result<T, DryError>;

impl DryError {
    /// 创建数据不可用错误
    pub fn data_unavailable(msg: impl Into<String>) -> Self {
        DryError::DataUnavailable(msg.into())
    }

    /// 创建预测错误
    pub fn estimator(msg: impl Into<String>) -> Self {
        DryError::Estimator(msg.into())
    }

    /// 过期响应只需丢弃，不需要提示用户
    pub fn is_stale(&self) -> bool {
        matches!(self, DryError::StaleResponse { .. })
    }

    /// 是否可在本地恢复（降级显示而非中断）
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DryError::EmptySession(_))
    }
}
