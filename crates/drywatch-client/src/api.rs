use anyhow::{anyhow, Result};
use async_trait::async_trait;
use drywatch_config::ApiConfig;
use drywatch_core::{
    DashboardSources, DryError, EstimatorSource, HistorySource, StatusSource,
};
use drywatch_types::{
    DeviceStatusReport, EstimateReport, Reading, SessionId, SessionStatusReport, Snapshot,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// 干燥后端 HTTP 客户端
///
/// 同一个客户端同时作为历史、状态和预测三个数据源
#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// 包装为看板数据源
    pub fn into_sources(self) -> DashboardSources {
        let client = Arc::new(self);
        DashboardSources {
            history: client.clone(),
            status: client.clone(),
            estimator: client,
        }
    }

    fn url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        debug!(path = %path, "GET");

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(anyhow!(
                "request {} failed: status={} body={}",
                path,
                status,
                text.trim()
            ));
        }

        serde_json::from_str(&text).map_err(|e| anyhow!("invalid response from {}: {}", path, e))
    }
}

#[async_trait]
impl HistorySource for ApiClient {
    async fn fetch_history(&self) -> drywatch_core::Result<Vec<Reading>> {
        let path = &self.config.history_path;
        let readings: Vec<Reading> = self
            .fetch_json(path, self.get(path))
            .await
            .map_err(|e| {
                warn!(error = %e, "History request failed");
                DryError::data_unavailable(e.to_string())
            })?;

        debug!(count = readings.len(), "History fetched");
        Ok(readings)
    }
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn device_status(&self) -> drywatch_core::Result<DeviceStatusReport> {
        let path = &self.config.device_status_path;
        self.fetch_json(path, self.get(path)).await.map_err(|e| {
            warn!(error = %e, "Device status request failed");
            DryError::data_unavailable(e.to_string())
        })
    }

    async fn session_status(&self, session_id: SessionId) -> drywatch_core::Result<SessionStatusReport> {
        let path = &self.config.session_status_path;
        let request = self.get(path).query(&[("test_id", session_id)]);
        self.fetch_json(path, request).await.map_err(|e| {
            warn!(session_id, error = %e, "Session status request failed");
            DryError::data_unavailable(e.to_string())
        })
    }
}

#[async_trait]
impl EstimatorSource for ApiClient {
    async fn estimate(&self, snapshot: &Snapshot) -> drywatch_core::Result<f64> {
        let path = &self.config.estimate_path;
        let request = self.get(path).query(&snapshot.query_pairs());

        let report: EstimateReport = self.fetch_json(path, request).await.map_err(|e| {
            warn!(error = %e, "Estimate request failed");
            DryError::estimator(e.to_string())
        })?;

        let minutes = report.estimated_drying_time_minutes;
        if !minutes.is_finite() {
            return Err(DryError::estimator(format!(
                "non-numeric estimate: {}",
                minutes
            )));
        }

        Ok(minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_join() {
        let api = client("http://localhost:8080/");
        assert_eq!(api.url("/api/timetodry"), "http://localhost:8080/api/timetodry");
        assert_eq!(api.url("api/ttd/status"), "http://localhost:8080/api/ttd/status");
    }

    #[test]
    fn test_into_sources_shares_client() {
        let sources = client("http://localhost:8080").into_sources();
        assert_eq!(Arc::strong_count(&sources.history), 3);
    }
}
