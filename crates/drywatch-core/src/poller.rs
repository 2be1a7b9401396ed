use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use drywatch_types::SessionId;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::source::StatusSource;
use crate::status::{PollTarget, StatusSample, StatusUpdate};

/// 实时状态轮询器
///
/// 绑定一个固定的轮询目标；目标变化时应停止旧轮询器并创建新的
pub struct LiveStatusPoller {
    target: PollTarget,
    handle: JoinHandle<()>,
}

impl LiveStatusPoller {
    /// 启动轮询
    ///
    /// 第一次轮询立即执行，之后按固定间隔重复；失败在下一次 tick 重试
    ///
    /// # 参数
    /// * `source` - 状态来源
    /// * `target` - 轮询目标
    /// * `period` - 轮询间隔
    /// * `on_update` - 每次轮询完成后的回调
    pub fn start<F>(
        source: Arc<dyn StatusSource>,
        target: PollTarget,
        period: Duration,
        mut on_update: F,
    ) -> Self
    where
        F: FnMut(StatusUpdate) + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let sample = Self::poll_once(source.as_ref(), target.session_id).await;
                debug!(
                    generation = target.generation,
                    device_ok = sample.device.is_ok(),
                    "Status polled"
                );
                on_update(StatusUpdate { target, sample });
            }
        });

        info!(
            generation = target.generation,
            session_id = ?target.session_id,
            period = ?period,
            "Status poller started"
        );

        Self { target, handle }
    }

    /// 拉取一次设备状态和（如有）会话状态
    pub async fn poll_once(source: &dyn StatusSource, session_id: Option<SessionId>) -> StatusSample {
        let session_fut = async {
            match session_id {
                Some(id) => Some(source.session_status(id).await),
                None => None,
            }
        };
        let (device, session) = tokio::join!(source.device_status(), session_fut);

        StatusSample {
            device,
            session,
            polled_at: Utc::now(),
        }
    }

    pub fn target(&self) -> PollTarget {
        self.target
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// 停止轮询，之后不会再有新的轮询发出
    pub fn stop(self) {
        info!(generation = self.target.generation, "Status poller stopping");
        self.handle.abort();
    }
}

impl Drop for LiveStatusPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DryError, Result};
    use async_trait::async_trait;
    use drywatch_types::{DeviceStatusReport, SessionPhase, SessionStatusReport};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingSource {
        device_calls: AtomicUsize,
        session_calls: AtomicUsize,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                device_calls: AtomicUsize::new(0),
                session_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StatusSource for CountingSource {
        async fn device_status(&self) -> Result<DeviceStatusReport> {
            let n = self.device_calls.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                return Err(DryError::data_unavailable("connection reset"));
            }
            Ok(DeviceStatusReport {
                is_working: true,
                latest_test_id: None,
                last_timestamp: None,
            })
        }

        async fn session_status(&self, session_id: SessionId) -> Result<SessionStatusReport> {
            self.session_calls.fetch_add(1, Ordering::SeqCst);
            Ok(SessionStatusReport {
                test_id: Some(session_id),
                status: SessionPhase::InProgress,
                last_timestamp: None,
            })
        }
    }

    fn target(session_id: Option<SessionId>) -> PollTarget {
        PollTarget {
            generation: 1,
            session_id,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_and_survives_failures() {
        let source = Arc::new(CountingSource::new());
        let updates = Arc::new(Mutex::new(Vec::new()));

        let sink = updates.clone();
        let poller = LiveStatusPoller::start(
            source.clone(),
            target(Some(7)),
            Duration::from_millis(100),
            move |update| sink.lock().unwrap().push(update),
        );
        assert!(poller.is_running());

        tokio::time::sleep(Duration::from_millis(250)).await;

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 3);
        assert!(updates[0].sample.device.is_ok());
        assert!(updates[1].sample.device.is_err());
        assert!(updates[2].sample.device.is_ok());
        assert!(updates.iter().all(|u| u.target == target(Some(7))));
        assert_eq!(source.session_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_only_without_session() {
        let source = Arc::new(CountingSource::new());
        let sample = LiveStatusPoller::poll_once(source.as_ref(), None).await;

        assert!(sample.session.is_none());
        assert_eq!(source.session_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_updates() {
        let source = Arc::new(CountingSource::new());
        let count = Arc::new(AtomicUsize::new(0));

        let counter = count.clone();
        let poller = LiveStatusPoller::start(
            source.clone(),
            target(None),
            Duration::from_millis(100),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        let before = count.load(Ordering::SeqCst);
        assert_eq!(before, 2);

        poller.stop();
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        assert_eq!(count.load(Ordering::SeqCst), before);
        assert_eq!(source.device_calls.load(Ordering::SeqCst), before);
    }
}
