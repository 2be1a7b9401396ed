use drywatch_types::SessionId;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::aggregator::SessionMap;
use crate::error::{DryError, Result};

/// 选择状态：初始化后不会回到未初始化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Uninitialized,
    Initialized(SessionId),
}

/// 选择变更原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// 首次拿到非空数据时自动选择
    AutoInitialized,
    /// 用户显式选择
    UserSelected,
}

/// 选择变更
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<SessionId>,
    pub current: SessionId,
    pub reason: SelectionReason,
}

/// 当前会话选择器
///
/// 首次拿到非空分组时自动选择 ID 最小的会话，之后只响应显式选择
pub struct SessionSelector {
    state: watch::Sender<Option<SessionId>>,
}

impl SessionSelector {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self { state }
    }

    pub fn current(&self) -> Option<SessionId> {
        *self.state.borrow()
    }

    pub fn state(&self) -> SelectionState {
        match self.current() {
            Some(id) => SelectionState::Initialized(id),
            None => SelectionState::Uninitialized,
        }
    }

    /// 订阅选择变更
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionId>> {
        self.state.subscribe()
    }

    /// 根据最新分组做一次性自动初始化
    ///
    /// 已有选择时不做任何事，重复刷新不会覆盖用户选择
    pub fn sync(&mut self, sessions: &SessionMap) -> Option<SelectionChange> {
        if self.current().is_some() {
            return None;
        }

        let first = *sessions.keys().next()?;
        self.state.send_replace(Some(first));
        info!(session_id = first, "Session auto-selected");

        Some(SelectionChange {
            previous: None,
            current: first,
            reason: SelectionReason::AutoInitialized,
        })
    }

    /// 显式选择会话
    ///
    /// # 错误
    /// * `UnknownSession` - 会话不在当前分组中，选择保持不变
    pub fn select(&mut self, id: SessionId, sessions: &SessionMap) -> Result<Option<SelectionChange>> {
        if !sessions.contains_key(&id) {
            return Err(DryError::UnknownSession(id));
        }

        let previous = self.current();
        if previous == Some(id) {
            debug!(session_id = id, "Session already selected");
            return Ok(None);
        }

        self.state.send_replace(Some(id));
        info!(session_id = id, previous = ?previous, "Session selected");

        Ok(Some(SelectionChange {
            previous,
            current: id,
            reason: SelectionReason::UserSelected,
        }))
    }
}

impl Default for SessionSelector {
    fn default() -> Self {
        Self::new()
    }
}
