//! Integration tests for the stats API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Raw logs and canonical snapshots live in a
//! temporary directory and geolocation is an in-memory fake.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::float_cmp)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use nmrih_api::router::build_router;
use nmrih_api::{AppState, GraphService, ParseService};
use nmrih_ingest::{GeoEnricher, GeoError, LogIngestor, RawLogScanner};
use nmrih_stats::StatsEngine;
use nmrih_store::{CsvRepository, LogRepository, ResponseCache};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Knows two public addresses; everything else is a failed lookup.
struct FixedGeo;

impl GeoEnricher for FixedGeo {
    async fn lookup(&self, ip: &str) -> Result<String, GeoError> {
        match ip {
            "85.12.34.56" => Ok(String::from("Russia")),
            "24.48.0.1" => Ok(String::from("Canada")),
            _ => Err(GeoError::Lookup(String::from("private range"))),
        }
    }
}

const FIRST_EVENING: &str = r#"L 03/01/2025 - 18:00:00: Log file started (file "logs/L0301000.log") (game "nmrih")
L 03/01/2025 - 18:22:11: "Bob<12><STEAM_1:0:123><>" connected, address "85.12.34.56:27005"
L 03/01/2025 - 18:22:40: "Bob<12><STEAM_1:0:123><>" entered the game
L 03/01/2025 - 18:25:03: "Alice<13><STEAM_1:1:456><>" connected, address "24.48.0.1:27005"
L 03/01/2025 - 18:40:00: "Bob<12><STEAM_1:0:123><Red>" committed suicide with "world"
L 03/01/2025 - 18:55:03: "Alice<13><STEAM_1:1:456><Red>" disconnected (reason "Disconnect by user.")
L 03/01/2025 - 19:02:00: "Bob<12><STEAM_1:0:123><Red>" disconnected (reason "Disconnect by user.")
"#;

const NEXT_MORNING: &str = r#"L 03/02/2025 - 09:00:00: "Carl<2><STEAM_1:0:9><>" connected, address "85.12.34.56:27005"
L 03/02/2025 - 10:00:00: "Carl<2><STEAM_1:0:9><>" disconnected (reason "timed out")
"#;

struct Harness {
    dir: TempDir,
    state: Arc<AppState<FixedGeo>>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("logs")).unwrap();

        let cache = ResponseCache::memory(Duration::from_secs(5));
        let csv = CsvRepository::new(dir.path().join("data"));
        let logs = LogRepository::new(format!("{}/*.log", dir.path().join("logs").display()));
        let ingestor = LogIngestor::new(RawLogScanner::new(false).unwrap(), Arc::new(FixedGeo), 4);

        let parse = ParseService::new(logs, csv.clone(), ingestor, cache.clone(), default_since());
        let graph = GraphService::new(
            csv,
            StatsEngine::default(),
            None,
            cache,
            Duration::from_secs(300),
        );

        Self {
            dir,
            state: Arc::new(AppState::new(parse, graph)),
        }
    }

    fn write_log(&self, name: &str, body: &str) {
        std::fs::write(self.dir.path().join("logs").join(name), body).unwrap();
    }

    fn snapshots(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(self.dir.path().join("data"))
            .map(|entries| entries.map(|e| e.unwrap().path()).collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = build_router(Arc::clone(&self.state))
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, body_to_json(response.into_body()).await)
    }
}

fn default_since() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =========================================================================
// Health check
// =========================================================================

#[tokio::test]
async fn health_check_returns_ok() {
    let harness = Harness::new();
    let (status, body) = harness.get("/health-check").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OK");
}

// =========================================================================
// Graph parameter validation
// =========================================================================

#[tokio::test]
async fn graph_without_type_is_bad_request() {
    let harness = Harness::new();
    let (status, body) = harness.get("/api/v1/graph").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid graph type");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn graph_with_unknown_type_is_bad_request() {
    let harness = Harness::new();
    let (status, body) = harness.get("/api/v1/graph?type=top-weapons").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid graph type");
}

#[tokio::test]
async fn players_info_without_game_server_is_unavailable() {
    let harness = Harness::new();
    let (status, body) = harness.get("/api/v1/graph?type=players-info").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], 503);
}

// =========================================================================
// Graphs before any snapshot exists
// =========================================================================

#[tokio::test]
async fn graphs_are_empty_before_first_parse() {
    let harness = Harness::new();

    let (status, body) = harness.get("/api/v1/graph?type=top-time-spent").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], serde_json::json!([]));

    let (_, body) = harness.get("/api/v1/graph?type=top-country").await;
    assert_eq!(
        body["data"],
        serde_json::json!([{ "country": "Other", "percentage": 100.0 }])
    );

    let (_, body) = harness.get("/api/v1/graph?type=online-statistics").await;
    let hours = body["data"].as_array().unwrap();
    assert_eq!(hours.len(), 24);
    assert_eq!(hours[0]["hour"], 3);
    assert!(hours.iter().all(|h| h["concurrent_players_count"] == 0.0));
}

// =========================================================================
// Parse then graph
// =========================================================================

#[tokio::test]
async fn parse_saves_snapshot_and_feeds_graphs() {
    let harness = Harness::new();
    harness.write_log("L0301000.log", FIRST_EVENING);

    let (status, body) = harness.get("/api/v1/parse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logs have been parsed successfully");
    assert_eq!(body["records"], 6);
    assert_eq!(body["errors"], serde_json::json!([]));

    let snapshots = harness.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].ends_with("logs_2025-03-01_19-02-00.csv"));

    let (status, body) = harness.get("/api/v1/graph?type=top-time-spent").await;
    assert_eq!(status, StatusCode::OK);
    let ranking = body["data"].as_array().unwrap();
    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0]["nick_name"], "Bob");
    assert_eq!(ranking[0]["time_spent"], 2_389_000_000_000_i64);
    assert_eq!(ranking[1]["nick_name"], "Alice");
    assert_eq!(ranking[1]["time_spent"], 1_800_000_000_000_i64);
}

#[tokio::test]
async fn second_parse_only_picks_up_new_lines() {
    let harness = Harness::new();
    harness.write_log("L0301000.log", FIRST_EVENING);
    let (_, first) = harness.get("/api/v1/parse").await;
    assert_eq!(first["records"], 6);

    let (status, again) = harness.get("/api/v1/parse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["records"], 0);
    assert_eq!(harness.snapshots().len(), 1);

    harness.write_log("L0302000.log", NEXT_MORNING);
    let (_, next) = harness.get("/api/v1/parse").await;
    assert_eq!(next["records"], 2);
    assert_eq!(harness.snapshots().len(), 2);
}

#[tokio::test]
async fn parse_invalidates_cached_graphs() {
    let harness = Harness::new();
    harness.write_log("L0301000.log", FIRST_EVENING);
    harness.get("/api/v1/parse").await;

    let (_, before) = harness.get("/api/v1/graph?type=top-country").await;
    assert_eq!(before["data"][0]["country"], "Canada");
    assert_eq!(before["data"][0]["percentage"], 50.0);

    harness.write_log("L0302000.log", NEXT_MORNING);
    harness.get("/api/v1/parse").await;

    let (_, after) = harness.get("/api/v1/graph?type=top-country").await;
    assert_eq!(after["data"][0]["country"], "Russia");
    let share = after["data"][0]["percentage"].as_f64().unwrap();
    assert!((share - 200.0 / 3.0).abs() < 1e-9);
}

// =========================================================================
// Parse error reporting
// =========================================================================

#[tokio::test]
async fn partial_failures_still_save_records() {
    let harness = Harness::new();
    harness.write_log(
        "L0301000.log",
        concat!(
            "L 03/01/2025 - 20:00:00: \"Dana<3><STEAM_1:0:8><>\" connected, address \"192.168.0.4:27005\"\n",
            "L 03/01/2025 - 20:30:00: \"Dana<3><STEAM_1:0:8><>\" disconnected (reason \"timed out\")\n",
        ),
    );

    let (status, body) = harness.get("/api/v1/parse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"], 2);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("192.168.0.4"));

    let (_, countries) = harness.get("/api/v1/graph?type=top-country").await;
    assert_eq!(countries["data"][0]["country"], "Unknown");
}

#[tokio::test]
async fn parse_with_only_errors_fails() {
    let harness = Harness::new();
    harness.write_log(
        "L0301000.log",
        "L 03/0X/2025 - 20:00:00: \"Dana<3><STEAM_1:0:8><>\" connected, address \"24.48.0.1:27005\"\n",
    );

    let (status, body) = harness.get("/api/v1/parse").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], 500);
    assert!(body["error"].as_str().unwrap().starts_with("ingestion failed"));
    assert!(harness.snapshots().is_empty());
}

#[tokio::test]
async fn parse_without_logs_reports_nothing() {
    let harness = Harness::new();
    let (status, body) = harness.get("/api/v1/parse").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"], 0);
    assert!(harness.snapshots().is_empty());
}
