use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use drywatch_types::{Reading, SessionId};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::aggregator::{self, SessionMap};
use crate::error::{DryError, Result};
use crate::estimator::{CompletionEstimator, EstimateRequest, EstimateState};
use crate::metrics::SessionMetrics;
use crate::notify::NoticeBoard;
use crate::poller::LiveStatusPoller;
use crate::selector::SessionSelector;
use crate::source::{EstimatorSource, HistorySource, StatusSource};
use crate::status::{StatusState, StatusTracker, StatusTransition, StatusUpdate};

/// 看板依赖的外部数据源
#[derive(Clone)]
pub struct DashboardSources {
    pub history: Arc<dyn HistorySource>,
    pub status: Arc<dyn StatusSource>,
    pub estimator: Arc<dyn EstimatorSource>,
}

/// 看板运行参数
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// 历史数据刷新间隔
    pub history_refresh: Duration,
    /// 实时状态轮询间隔
    pub status_poll: Duration,
    /// 通知历史容量
    pub notice_capacity: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            history_refresh: Duration::from_secs(60),
            status_poll: Duration::from_secs(10),
            notice_capacity: NoticeBoard::DEFAULT_CAPACITY,
        }
    }
}

/// 异步请求完成后回送给看板的事件
#[derive(Debug)]
pub enum DashboardEvent {
    Estimate {
        request: EstimateRequest,
        result: Result<f64>,
    },
    Status(StatusUpdate),
}

/// 看板阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// 还没有任何读数
    Empty,
    /// 有读数，但选中会话的指标尚未得出
    Loading,
    /// 选择和指标都已就绪（预测可能仍在等待）
    Ready,
}

/// 预测展示状态
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "minutes", rename_all = "lowercase")]
pub enum EstimateView {
    Absent,
    Pending,
    Ready(f64),
}

/// 提供给展示层的只读视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub phase: Phase,
    pub selected: Option<SessionId>,
    /// 供选择控件使用的会话列表（升序）
    pub session_ids: Vec<SessionId>,
    pub metrics: Option<SessionMetrics>,
    pub duration_label: Option<String>,
    pub estimate: EstimateView,
    pub percent_complete: u8,
    pub status: StatusState,
    /// 选中会话的时间序列（图表）
    pub series: Vec<Reading>,
    /// 最近一次历史刷新失败，显示的是上一次的数据
    pub history_degraded: bool,
}

impl DashboardView {
    fn empty() -> Self {
        Self {
            phase: Phase::Empty,
            selected: None,
            session_ids: Vec::new(),
            metrics: None,
            duration_label: None,
            estimate: EstimateView::Absent,
            percent_complete: 0,
            status: StatusState::default(),
            series: Vec::new(),
            history_degraded: false,
        }
    }
}

enum Step {
    Refresh,
    Event(DashboardEvent),
}

/// 干燥看板
///
/// 组合分组、选择、指标、预测和状态轮询。所有状态只在这里修改，
/// 异步请求的结果通过事件通道回到这里，按请求标记丢弃过期响应
pub struct Dashboard {
    sources: DashboardSources,
    options: DashboardOptions,

    readings: Vec<Reading>,
    sessions: SessionMap,
    selector: SessionSelector,
    metrics: Option<SessionMetrics>,

    estimator: CompletionEstimator,
    /// 最近一次预测请求对应的读数
    estimated_for: Option<Reading>,

    status: StatusTracker,
    poller: Option<LiveStatusPoller>,
    mounted: bool,

    history_degraded: bool,
    notices: NoticeBoard,

    events_tx: mpsc::UnboundedSender<DashboardEvent>,
    events_rx: mpsc::UnboundedReceiver<DashboardEvent>,
    view_tx: watch::Sender<DashboardView>,
}

impl Dashboard {
    pub fn new(sources: DashboardSources, options: DashboardOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, _) = watch::channel(DashboardView::empty());
        let notices = NoticeBoard::new(options.notice_capacity);

        Self {
            sources,
            options,
            readings: Vec::new(),
            sessions: SessionMap::new(),
            selector: SessionSelector::new(),
            metrics: None,
            estimator: CompletionEstimator::new(),
            estimated_for: None,
            status: StatusTracker::new(),
            poller: None,
            mounted: false,
            history_degraded: false,
            notices,
            events_tx,
            events_rx,
            view_tx,
        }
    }

    /// 使用外部共享的通知历史
    pub fn with_notices(mut self, notices: NoticeBoard) -> Self {
        self.notices = notices;
        self
    }

    pub fn notices(&self) -> NoticeBoard {
        self.notices.clone()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<DashboardView> {
        self.view_tx.subscribe()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<Option<SessionId>> {
        self.selector.subscribe()
    }

    pub fn sessions(&self) -> &SessionMap {
        &self.sessions
    }

    pub fn selected(&self) -> Option<SessionId> {
        self.selector.current()
    }

    pub fn metrics(&self) -> Option<&SessionMetrics> {
        self.metrics.as_ref()
    }

    pub fn estimate_state(&self) -> &EstimateState {
        self.estimator.state()
    }

    pub fn status(&self) -> &StatusState {
        self.status.state()
    }

    /// 开始实时状态轮询
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.restart_poller();
    }

    /// 停止实时状态轮询，已在途的响应会被丢弃
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.status.detach();
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
    }

    /// 拉取一次历史数据
    ///
    /// 失败时保留上一次的数据并标记为降级
    pub async fn refresh_history(&mut self) -> Result<()> {
        match self.sources.history.fetch_history().await {
            Ok(readings) => {
                self.history_degraded = false;
                self.apply_history(readings);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "History refresh failed");
                self.history_degraded = true;
                self.publish();
                Err(match e {
                    DryError::DataUnavailable(_) => e,
                    other => DryError::data_unavailable(other.to_string()),
                })
            }
        }
    }

    /// 应用新的历史数据并重新派生
    pub fn apply_history(&mut self, readings: Vec<Reading>) {
        if readings != self.readings {
            self.sessions = aggregator::group(&readings);
            self.readings = readings;
            debug!(
                readings = self.readings.len(),
                sessions = self.sessions.len(),
                "History regrouped"
            );
        }

        if self.selector.sync(&self.sessions).is_some() {
            self.restart_poller();
        }
        self.recompute();
        self.publish();
    }

    /// 显式选择会话
    ///
    /// # 错误
    /// * `UnknownSession` - 会话不在当前数据中
    pub fn select(&mut self, session_id: SessionId) -> Result<()> {
        if self.selector.select(session_id, &self.sessions)?.is_some() {
            self.restart_poller();
            self.recompute();
            self.publish();
        }
        Ok(())
    }

    /// 等待下一个异步事件
    pub async fn next_event(&mut self) -> Option<DashboardEvent> {
        self.events_rx.recv().await
    }

    /// 等待并处理下一个异步事件
    pub async fn process_next(&mut self) -> Option<Result<()>> {
        let event = self.next_event().await?;
        Some(self.handle_event(event).await)
    }

    /// 处理异步事件
    ///
    /// # 错误
    /// * `StaleResponse` - 响应已过期，已丢弃
    /// * `Estimator` - 预测失败，预测保持等待状态
    pub async fn handle_event(&mut self, event: DashboardEvent) -> Result<()> {
        let outcome = match event {
            DashboardEvent::Estimate { request, result } => {
                match self.estimator.resolve(&request, result) {
                    Ok(_) => Ok(()),
                    Err(e) if e.is_stale() => Err(e),
                    Err(e) => {
                        self.notices
                            .error(format!(
                                "Unable to estimate drying time for TEST-{}",
                                request.session_id
                            ))
                            .await;
                        Err(e)
                    }
                }
            }
            DashboardEvent::Status(update) => match self.status.apply(update) {
                Ok(transitions) => {
                    for transition in transitions {
                        self.notify_transition(transition).await;
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            },
        };

        self.publish();
        outcome
    }

    /// 当前视图
    pub fn view(&self) -> DashboardView {
        let selected = self.selector.current();
        let phase = if self.readings.is_empty() {
            Phase::Empty
        } else if self.metrics.is_none() {
            Phase::Loading
        } else {
            Phase::Ready
        };

        let estimate = match self.estimator.state() {
            EstimateState::Absent => EstimateView::Absent,
            EstimateState::Pending(_) => EstimateView::Pending,
            EstimateState::Ready { minutes, .. } => EstimateView::Ready(*minutes),
        };

        let series = selected
            .and_then(|id| self.sessions.get(&id))
            .map(|session| session.readings().to_vec())
            .unwrap_or_default();

        DashboardView {
            phase,
            selected,
            session_ids: self.sessions.keys().copied().collect(),
            duration_label: self.metrics.as_ref().map(SessionMetrics::duration_label),
            percent_complete: self
                .metrics
                .as_ref()
                .map(|m| self.estimator.percent_complete(m.elapsed_minutes))
                .unwrap_or(0),
            metrics: self.metrics.clone(),
            estimate,
            status: self.status.state().clone(),
            series,
            history_degraded: self.history_degraded,
        }
    }

    /// 运行看板直到 `shutdown` 完成
    ///
    /// 按固定间隔刷新历史数据，并处理预测和状态轮询的结果
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.mount();

        let mut refresh = interval(self.options.history_refresh.max(Duration::from_millis(1)));
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            history_refresh = ?self.options.history_refresh,
            status_poll = ?self.options.status_poll,
            "Dashboard started"
        );

        loop {
            let step = tokio::select! {
                _ = &mut shutdown => None,
                _ = refresh.tick() => Some(Step::Refresh),
                Some(event) = self.events_rx.recv() => Some(Step::Event(event)),
            };

            match step {
                None => break,
                Some(Step::Refresh) => {
                    // 失败已在 refresh_history 中记录，等待下一次刷新
                    let _ = self.refresh_history().await;
                }
                Some(Step::Event(event)) => match self.handle_event(event).await {
                    Err(e) if e.is_stale() => debug!(error = %e, "Stale response dropped"),
                    Err(e) => warn!(error = %e, "Dashboard event failed"),
                    Ok(()) => {}
                },
            }
        }

        self.unmount();
        info!("Dashboard stopped");
    }

    fn restart_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        if !self.mounted {
            return;
        }

        let target = self.status.retarget(self.selector.current());
        let tx = self.events_tx.clone();
        self.poller = Some(LiveStatusPoller::start(
            self.sources.status.clone(),
            target,
            self.options.status_poll,
            move |update| {
                let _ = tx.send(DashboardEvent::Status(update));
            },
        ));
    }

    fn recompute(&mut self) {
        let session = match self.selector.current().and_then(|id| self.sessions.get(&id)) {
            Some(session) => session,
            None => {
                self.metrics = None;
                if self.estimated_for.take().is_some() {
                    self.estimator.reset();
                }
                return;
            }
        };

        let metrics = SessionMetrics::derive(session);
        let latest = metrics.latest.clone();
        self.metrics = Some(metrics);

        // 快照没变（例如无变化的历史刷新）时不重复请求
        if self.estimated_for.as_ref() != Some(&latest) {
            self.request_estimate(latest);
        }
    }

    fn request_estimate(&mut self, latest: Reading) {
        let request = self.estimator.issue(latest.session_id, latest.snapshot());
        self.estimated_for = Some(latest);

        let source = self.sources.estimator.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = source.estimate(&request.snapshot).await;
            let _ = tx.send(DashboardEvent::Estimate { request, result });
        });
    }

    async fn notify_transition(&self, transition: StatusTransition) {
        match transition {
            StatusTransition::SessionCompleted(id) => {
                self.notices
                    .success(format!("TEST-{} drying completed", id))
                    .await;
            }
            StatusTransition::DeviceStopped => {
                self.notices.error("Drying device stopped reporting").await;
            }
            StatusTransition::DeviceResumed => {
                self.notices.info("Drying device is reporting again").await;
            }
        }
    }

    fn publish(&self) {
        let view = self.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}
