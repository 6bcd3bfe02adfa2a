//! Integration tests for the HTTP surface.

use std::collections::HashMap;
use std::io;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use harbor_lens::api::{self, AppState};
use harbor_lens::container::{
    ContainerAttributes, ContainerHandle, ContainerID, ContainerIdentity, ContainerRuntime,
    ContainerState, PortBinding,
};
use harbor_lens::probe::{PROBE_HEADER, PortClassifier, PortProber, Protocol};
use harbor_lens::processor::ContainerProcessor;
use harbor_lens::stats::RawStats;
use tower::ServiceExt;

const STATS: &str = r#"{
    "cpu_stats": {"cpu_usage": {"total_usage": 300}, "system_cpu_usage": 2000, "online_cpus": 2},
    "precpu_stats": {"cpu_usage": {"total_usage": 100}, "system_cpu_usage": 1000},
    "memory_stats": {"usage": 300, "cache": 100, "limit": 1000}
}"#;

struct FakeContainer {
    identity: ContainerIdentity,
    attributes: ContainerAttributes,
}

impl ContainerHandle for FakeContainer {
    type Error = io::Error;

    fn identity(&self) -> &ContainerIdentity {
        &self.identity
    }

    async fn stats(&self) -> Result<RawStats, io::Error> {
        RawStats::from_slice(STATS.as_bytes()).map_err(io::Error::other)
    }

    async fn attributes(&self) -> Result<ContainerAttributes, io::Error> {
        Ok(self.attributes.clone())
    }
}

/// Lists the given containers, or fails if there are none configured.
struct FakeRuntime {
    containers: Option<Vec<(&'static str, &'static str, Vec<&'static str>)>>,
}

impl ContainerRuntime for FakeRuntime {
    type Container = FakeContainer;
    type Error = io::Error;

    async fn list_containers(&self) -> Result<Vec<FakeContainer>, io::Error> {
        let containers = self
            .containers
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "engine down"))?;

        Ok(containers
            .iter()
            .map(|(id, name, host_ports)| FakeContainer {
                identity: ContainerIdentity::new(ContainerID::new(id).unwrap(), *name),
                attributes: ContainerAttributes {
                    state: ContainerState {
                        status: Some("running".to_owned()),
                        health: None,
                        started_at: Some("2024-05-01T11:00:00.000000001Z".to_owned()),
                    },
                    port_bindings: vec![PortBinding::new("80/tcp", host_ports.iter())],
                },
            })
            .collect())
    }
}

struct MapProber(HashMap<u16, Protocol>);

impl PortProber for MapProber {
    async fn probe(&self, _host: &str, port: u16) -> Option<Protocol> {
        self.0.get(&port).copied()
    }
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap()
}

fn app(runtime: FakeRuntime) -> axum::Router {
    let prober = MapProber(HashMap::from([(8080, Protocol::Http), (8443, Protocol::Https)]));
    api::router(AppState {
        runtime,
        processor: ContainerProcessor::new(PortClassifier::new(prober)).with_clock(fixed_now),
        host: "node-1".to_owned(),
        current_container_id: Some("cafe".to_owned()),
        version: "1.2.3".to_owned(),
    })
}

async fn body_string(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_probe_request_answers_alive() {
    let response = app(FakeRuntime { containers: None })
        .oneshot(
            Request::builder()
                .uri("/")
                .header(PROBE_HEADER, "true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Alive");
}

#[tokio::test]
async fn test_about_reports_version() {
    let response = app(FakeRuntime { containers: None })
        .oneshot(Request::builder().uri("/about").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Version: 1.2.3");
}

#[tokio::test]
async fn test_reports_payload() {
    let runtime = FakeRuntime {
        containers: Some(vec![
            ("f00d1", "web", vec!["8443", "8080", "9000"]),
            ("cafe0123", "harbor-lens", vec!["5000"]),
            ("beef2", "db", vec![]),
        ]),
    };

    let response = app(runtime)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(payload["hostname"], "node-1");
    assert_eq!(payload["version"], "1.2.3");

    let expected_container = |name: &str, ports: serde_json::Value| {
        serde_json::json!({
            "name": name,
            "ports": ports,
            "cpu_percent": 40.0,
            "memory_percent": 20.0,
            "status": "running",
            "health": "N/A",
            "uptime": "01:30:15"
        })
    };
    assert_eq!(
        payload["containers"],
        serde_json::json!([
            expected_container("db", serde_json::json!([])),
            expected_container(
                "web",
                serde_json::json!([
                    {"protocol": "http", "port": 8080},
                    {"protocol": "https", "port": 8443}
                ])
            ),
        ])
    );
}

#[tokio::test]
async fn test_listing_failure_yields_no_containers() {
    let response = app(FakeRuntime { containers: None })
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(payload["containers"], serde_json::json!([]));
}
