pub mod aggregator;
pub mod dashboard;
pub mod error;
pub mod estimator;
pub mod metrics;
pub mod notify;
pub mod poller;
pub mod selector;
pub mod source;
pub mod status;

pub use aggregator::{Session, SessionMap};
pub use dashboard::{
    Dashboard, DashboardEvent, DashboardOptions, DashboardSources, DashboardView, EstimateView,
    Phase,
};
pub use error::{DryError, Result};
pub use estimator::{percent_complete, CompletionEstimator, EstimateRequest, EstimateState};
pub use metrics::{elapsed_minutes, format_duration, SessionMetrics};
pub use notify::{Notice, NoticeBoard, NoticeLevel};
pub use poller::LiveStatusPoller;
pub use selector::{SelectionChange, SelectionReason, SelectionState, SessionSelector};
pub use source::{EstimatorSource, HistorySource, StatusSource};
pub use status::{
    PollTarget, SessionStatus, StatusSample, StatusState, StatusTracker, StatusTransition,
    StatusUpdate,
};
