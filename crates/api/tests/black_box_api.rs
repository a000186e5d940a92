use std::sync::Arc;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use reqwest::StatusCode;

use storewatch_api::app::{build_app, services::AppServices};
use storewatch_core::{Observation, StoreStatus};
use storewatch_infra::sources::{InMemoryObservationSource, InMemoryScheduleSource};

struct TestServer {
    base_url: String,
    observations: Arc<InMemoryObservationSource>,
    schedules: Arc<InMemoryScheduleSource>,
    handle: tokio::task::JoinHandle<()>,
    _reports_dir: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let reports_dir = tempfile::tempdir().expect("failed to create reports dir");
        let observations = Arc::new(InMemoryObservationSource::new());
        let schedules = Arc::new(InMemoryScheduleSource::new());
        let services = AppServices::in_memory(observations.clone(), schedules.clone(), reports_dir.path());
        let app = build_app(services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            observations,
            schedules,
            handle,
            _reports_dir: reports_dir,
        }
    }

    /// Three stores polled in the last minute; store "b" has no timezone.
    fn seed_three_stores(&self) {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        for (store, status) in [("a", StoreStatus::Active), ("b", StoreStatus::Active), ("c", StoreStatus::Inactive)] {
            self.observations
                .record(Observation::new(store, now - ChronoDuration::minutes(1), status))
                .unwrap();
        }
        self.schedules.set_timezone("a", "America/Chicago").unwrap();
        self.schedules.set_timezone("c", "UTC").unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn trigger(client: &reqwest::Client, base_url: &str) -> String {
    let res = client
        .post(format!("{}/trigger_report", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["report_id"].as_str().unwrap().to_string()
}

async fn get_report_eventually(client: &reqwest::Client, base_url: &str, id: &str) -> reqwest::Response {
    // Reports are computed in the background; poll until the job leaves "Running".
    for _ in 0..100 {
        let res = client
            .get(format!("{}/get_report/{}", base_url, id))
            .send()
            .await
            .unwrap();

        let running = res.status() == StatusCode::OK
            && res
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .is_some_and(|v| v.to_str().unwrap_or_default().starts_with("application/json"));
        if !running {
            return res;
        }

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("report did not finish within timeout");
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["executor"]["jobs_processed"], 0);
}

#[tokio::test]
async fn health_reports_finished_jobs() {
    let srv = TestServer::spawn().await;
    srv.seed_three_stores();
    let client = reqwest::Client::new();

    let id = trigger(&client, &srv.base_url).await;
    get_report_eventually(&client, &srv.base_url, &id).await;

    // Stats are recorded just after the job's final status is persisted.
    for _ in 0..100 {
        let body: serde_json::Value = reqwest::get(format!("{}/health", srv.base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["executor"]["jobs_completed"] == 1 {
            assert_eq!(body["executor"]["jobs_processed"], 1);
            assert_eq!(body["executor"]["jobs_failed"], 0);
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("completed job never showed up in executor stats");
}

#[tokio::test]
async fn report_lifecycle_trigger_poll_download() {
    let srv = TestServer::spawn().await;
    srv.seed_three_stores();
    let client = reqwest::Client::new();

    let id = trigger(&client, &srv.base_url).await;

    let res = get_report_eventually(&client, &srv.base_url, &id).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["report-status"], "Completed");
    assert_eq!(res.headers()[reqwest::header::CONTENT_TYPE], "text/csv");
    let disposition = res.headers()[reqwest::header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains(&format!("report_{id}.csv")));

    let body = res.text().await.unwrap();
    let lines: Vec<_> = body.lines().collect();
    assert_eq!(
        lines[0],
        "store_id,uptime_last_hour,uptime_last_day,uptime_last_week,downtime_last_hour,downtime_last_day,downtime_last_week"
    );
    // Store "b" has no timezone and is skipped.
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("a,"));
    assert!(lines[2].starts_with("c,"));

    // Downloading again returns the same bytes.
    let again = client
        .get(format!("{}/get_report/{}", srv.base_url, id))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(again, body);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/get_report/{}", srv.base_url, "0190f3b4-9a3c-7cc0-8a3e-6e3f4c2d1b00"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = client
        .get(format!("{}/get_report/{}", srv.base_url, "not-a-report"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_without_any_observations_fails() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = trigger(&client, &srv.base_url).await;

    let res = get_report_eventually(&client, &srv.base_url, &id).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "Failed");
    assert!(body["error"].as_str().unwrap().contains("no observations"));
}
