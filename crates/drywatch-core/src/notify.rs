use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// 通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

struct NoticeHistory {
    next_id: u64,
    capacity: usize,
    notices: VecDeque<Notice>,
}

/// 通知历史
///
/// 可克隆的句柄，所有克隆共享同一份历史；只保留最新的 `capacity` 条，最新的在前
#[derive(Clone)]
pub struct NoticeBoard {
    inner: Arc<RwLock<NoticeHistory>>,
}

impl NoticeBoard {
    pub const DEFAULT_CAPACITY: usize = 20;

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(RwLock::new(NoticeHistory {
                next_id: 1,
                capacity,
                notices: VecDeque::with_capacity(capacity),
            })),
        }
    }

    /// 发布通知，超出容量时淘汰最旧的
    pub async fn push(&self, level: NoticeLevel, message: impl Into<String>) -> Notice {
        let mut history = self.inner.write().await;
        let notice = Notice {
            id: history.next_id,
            level,
            message: message.into(),
            created_at: Utc::now(),
        };
        history.next_id += 1;

        history.notices.push_front(notice.clone());
        while history.notices.len() > history.capacity {
            history.notices.pop_back();
        }

        debug!(id = notice.id, level = ?notice.level, message = %notice.message, "Notice posted");
        notice
    }

    pub async fn info(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Info, message).await
    }

    pub async fn success(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Success, message).await
    }

    pub async fn error(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeLevel::Error, message).await
    }

    /// 最近的通知，最新的在前
    pub async fn recent(&self) -> Vec<Notice> {
        self.inner.read().await.notices.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.notices.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.notices.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.write().await.notices.clear();
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
