use drywatch_core::{DashboardView, EstimateView, Notice, NoticeLevel, Phase};

/// 单行视图摘要
pub fn summary(view: &DashboardView) -> String {
    let mut parts = Vec::new();

    match view.phase {
        Phase::Empty => parts.push("no drying data yet".to_string()),
        Phase::Loading => {
            parts.push(session_label(view));
            parts.push("loading".to_string());
        }
        Phase::Ready => {
            parts.push(session_label(view));
            if let Some(label) = &view.duration_label {
                parts.push(label.clone());
            }
            parts.push(match view.estimate {
                EstimateView::Absent => "no estimate".to_string(),
                EstimateView::Pending => "estimate pending".to_string(),
                EstimateView::Ready(minutes) => {
                    format!("{}% of {:.0} min", view.percent_complete, minutes)
                }
            });
        }
    }

    parts.push(device_label(view));
    if let Some(session) = &view.status.session {
        parts.push(session.phase.as_str().to_string());
    }

    let mut line = parts.join(" | ");
    if view.history_degraded {
        line.push_str(" (history stale)");
    }
    if view.status.degraded {
        line.push_str(" (status partial)");
    }
    line
}

/// 通知行
pub fn notice_line(notice: &Notice) -> String {
    let level = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Error => "error",
    };
    format!(
        "[{}] {} {}",
        level,
        notice.created_at.format("%H:%M:%S"),
        notice.message
    )
}

fn session_label(view: &DashboardView) -> String {
    match view.selected {
        Some(id) => format!("TEST-{}", id),
        None => "-".to_string(),
    }
}

fn device_label(view: &DashboardView) -> String {
    match view.status.is_working {
        Some(true) => "device working".to_string(),
        Some(false) => "device stopped".to_string(),
        None => "device unknown".to_string(),
    }
}
