mod logging;
mod render;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use drywatch_client::ApiClient;
use drywatch_config::{ConfigLoader, DashboardConfig};
use drywatch_core::{Dashboard, DashboardOptions, EstimateState};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "drywatch", author, version, about = "Cloth drying session monitor", long_about = None)]
struct Args {
    /// Directory containing drywatch.toml
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,

    /// Override the configured log level (e.g. "debug", "drywatch_core=trace")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Fetch once, print a summary and exit
    #[arg(long)]
    once: bool,

    /// With --once, print the full view as JSON
    #[arg(long, requires = "once")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new(&args.config_dir).load_validated()?;
    logging::init(&config.logging, args.log_level.as_deref())?;

    info!(
        config_dir = %args.config_dir.display(),
        base_url = %config.api.base_url,
        "Starting drywatch"
    );

    let client = ApiClient::new(config.api.clone())?;
    let dashboard = Dashboard::new(client.into_sources(), dashboard_options(&config));

    if args.once {
        run_once(dashboard, config.api.timeout(), args.json).await
    } else {
        run(dashboard).await
    }
}

fn dashboard_options(config: &DashboardConfig) -> DashboardOptions {
    DashboardOptions {
        history_refresh: config.polling.history_refresh(),
        status_poll: config.polling.status_poll(),
        notice_capacity: config.notifications.capacity,
    }
}

/// 第一次状态轮询完成且预测不再等待
fn is_settled(dashboard: &Dashboard) -> bool {
    dashboard.status().last_polled_at.is_some()
        && !matches!(dashboard.estimate_state(), EstimateState::Pending(_))
}

async fn run_once(mut dashboard: Dashboard, timeout: Duration, json: bool) -> Result<()> {
    if let Err(e) = dashboard.refresh_history().await {
        warn!(error = %e, "History unavailable");
    }
    dashboard.mount();

    let settle = async {
        while !is_settled(&dashboard) {
            match dashboard.process_next().await {
                Some(Err(e)) if !e.is_stale() => warn!(error = %e, "Request failed"),
                Some(_) => {}
                None => break,
            }
        }
    };

    // 预测和状态请求并发执行，各自受请求超时约束
    if tokio::time::timeout(timeout * 2, settle).await.is_err() {
        warn!("Timed out waiting for live status and estimate");
    }

    let view = dashboard.view();
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", render::summary(&view));
        for notice in dashboard.notices().recent().await {
            println!("{}", render::notice_line(&notice));
        }
    }

    dashboard.unmount();
    Ok(())
}

async fn run(dashboard: Dashboard) -> Result<()> {
    let mut views = dashboard.subscribe_view();
    let notices = dashboard.notices();

    let reporter = tokio::spawn(async move {
        let mut last_notice = 0;
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            info!("{}", render::summary(&view));

            let fresh: Vec<_> = notices
                .recent()
                .await
                .into_iter()
                .filter(|notice| notice.id > last_notice)
                .collect();
            for notice in fresh.iter().rev() {
                info!("{}", render::notice_line(notice));
            }
            if let Some(newest) = fresh.first() {
                last_notice = newest.id;
            }
        }
    });

    dashboard
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await;

    let _ = reporter.await;
    Ok(())
}
