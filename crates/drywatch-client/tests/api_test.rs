use std::time::Duration;

use chrono::{TimeZone, Utc};
use drywatch_client::ApiClient;
use drywatch_config::ApiConfig;
use drywatch_core::{DryError, EstimatorSource, HistorySource, StatusSource};
use drywatch_types::{SessionPhase, Snapshot};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_client(server: &MockServer) -> ApiClient {
    ApiClient::new(ApiConfig {
        base_url: server.uri(),
        timeout_ms: 500,
        ..ApiConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/timetodry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 1,
                "test_id": 3,
                "timestamp": "2025-04-01 08:00:00",
                "light": 820.0,
                "temp_in": 34.5,
                "temp_out": 30.1,
                "hum_in": 72.0,
                "hum_out": 60.0,
                "diff_temp": 4.4,
                "diff_hum": 12.0,
                "lat": 13.7,
                "lon": 100.5
            },
            {
                "test_id": 3,
                "timestamp": "2025-04-01T08:10:00Z",
                "temp_in": 35.0,
                "temp_out": 30.0,
                "hum_in": 65.0,
                "hum_out": 60.0
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let readings = create_client(&server).fetch_history().await.unwrap();

    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].session_id, 3);
    assert_eq!(readings[0].light_level, 820.0);
    assert_eq!(
        readings[0].timestamp,
        Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap()
    );
    assert_eq!(
        readings[1].timestamp,
        Utc.with_ymd_and_hms(2025, 4, 1, 8, 10, 0).unwrap()
    );
    assert_eq!(readings[1].light_level, 0.0);
}

#[tokio::test]
async fn test_history_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/timetodry"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .mount(&server)
        .await;

    let err = create_client(&server).fetch_history().await.unwrap_err();
    match err {
        DryError::DataUnavailable(msg) => assert!(msg.contains("500")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_history_malformed_body_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/timetodry"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = create_client(&server).fetch_history().await.unwrap_err();
    assert!(matches!(err, DryError::DataUnavailable(_)));
}

#[tokio::test]
async fn test_device_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ttd/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_working": false,
            "latest_test_id": 4,
            "last_timestamp": "2025-04-01 09:30:00"
        })))
        .mount(&server)
        .await;

    let report = create_client(&server).device_status().await.unwrap();
    assert!(!report.is_working);
    assert_eq!(report.latest_test_id, Some(4));
    assert_eq!(
        report.last_timestamp,
        Some(Utc.with_ymd_and_hms(2025, 4, 1, 9, 30, 0).unwrap())
    );
}

#[tokio::test]
async fn test_session_status_sends_test_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ttd/status/check"))
        .and(query_param("test_id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "test_id": 7,
            "status": "completed",
            "last_timestamp": "2025-04-01 09:30:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = create_client(&server).session_status(7).await.unwrap();
    assert_eq!(report.test_id, Some(7));
    assert_eq!(report.status, SessionPhase::Completed);
}

#[tokio::test]
async fn test_session_status_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ttd/status/check"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No records found for given test_id"))
        .mount(&server)
        .await;

    let err = create_client(&server).session_status(99).await.unwrap_err();
    assert!(matches!(err, DryError::DataUnavailable(_)));
}

#[tokio::test]
async fn test_estimate_sends_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/drytime/estimate"))
        .and(query_param("temp_in", "34.5"))
        .and(query_param("temp_out", "30"))
        .and(query_param("hum_in", "60.5"))
        .and(query_param("hum_out", "55"))
        .and(query_param("light", "800"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "estimated_drying_time_minutes": 120.0,
            "inputs": { "temp_in": 34.5 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = Snapshot {
        temp_in: 34.5,
        temp_out: 30.0,
        hum_in: 60.5,
        hum_out: 55.0,
        light: 800.0,
    };

    let minutes = create_client(&server).estimate(&snapshot).await.unwrap();
    assert_eq!(minutes, 120.0);
}

#[tokio::test]
async fn test_estimate_missing_field_is_estimator_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/drytime/estimate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "estimated_drying_time_minutes": "soon"
        })))
        .mount(&server)
        .await;

    let snapshot = Snapshot {
        temp_in: 30.0,
        temp_out: 30.0,
        hum_in: 50.0,
        hum_out: 50.0,
        light: 0.0,
    };

    let err = create_client(&server).estimate(&snapshot).await.unwrap_err();
    assert!(matches!(err, DryError::Estimator(_)));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ttd/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "is_working": true }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = create_client(&server).device_status().await.unwrap_err();
    assert!(matches!(err, DryError::DataUnavailable(_)));
}
