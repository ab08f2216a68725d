#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the `/bots` control surface.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    reqwest::StatusCode,
    serde_json::Value,
    tokio::net::TcpListener,
};

use {
    chorus_common::{ChatRecord, StreamTarget},
    chorus_config::{Account, Credentials},
    chorus_gateway::{AppState, StartDefaults, build_app},
    chorus_session::{
        DeliveryError, DeliveryService, GenerationError, GenerationService, ResolveError,
        SessionDeps, StreamTargetResolver,
    },
    chorus_stream::MemoryTransport,
    chorus_supervisor::{ChannelSupervisor, LivenessProbe, ProbeError, SupervisorSettings},
};

struct Fakes {
    live: AtomicBool,
}

#[async_trait]
impl LivenessProbe for Fakes {
    async fn is_live(&self, _channel: &str) -> Result<bool, ProbeError> {
        Ok(self.live.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl StreamTargetResolver for Fakes {
    async fn resolve(&self, _channel: &str) -> Result<StreamTarget, ResolveError> {
        Ok(StreamTarget(7))
    }
}

#[async_trait]
impl GenerationService for Fakes {
    async fn generate(&self, _history: &[ChatRecord]) -> Result<Vec<String>, GenerationError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl DeliveryService for Fakes {
    async fn send(
        &self,
        _account: &Account,
        _proxy: Option<&str>,
        _target: StreamTarget,
        _content: &str,
    ) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Spin up the control surface on an ephemeral port.
async fn start_test_server(live: bool) -> (SocketAddr, ChannelSupervisor) {
    let fakes = Arc::new(Fakes {
        live: AtomicBool::new(live),
    });
    let deps = SessionDeps {
        resolver: Arc::clone(&fakes) as Arc<dyn StreamTargetResolver>,
        transport: Arc::new(MemoryTransport::new()),
        generator: Arc::clone(&fakes) as Arc<dyn GenerationService>,
        delivery: Arc::clone(&fakes) as Arc<dyn DeliveryService>,
        credentials: Arc::new(Credentials::default()),
    };
    let supervisor = ChannelSupervisor::new(fakes, deps, SupervisorSettings {
        live_check_interval: Duration::from_millis(50),
        collection_interval: Duration::from_secs(30),
        keepalive_interval: Duration::from_secs(50),
    });
    let app = build_app(AppState {
        supervisor: supervisor.clone(),
        defaults: StartDefaults {
            messages_per_minute: 20,
            sender_count: 10,
        },
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, supervisor)
}

async fn post(addr: SocketAddr, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let client = reqwest::Client::new();
    let mut req = client.post(format!("http://{addr}{path}"));
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req.send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

async fn get(addr: SocketAddr, path: &str) -> (StatusCode, Value) {
    let resp = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_channel_count() {
    let (addr, supervisor) = start_test_server(false).await;
    let (status, json) = get(addr, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["channels"], 0);

    supervisor.start("alice", 20, 10).unwrap();
    let (_, json) = get(addr, "/health").await;
    assert_eq!(json["channels"], 1);
    supervisor.shutdown().await;
}

#[tokio::test]
async fn start_twice_conflicts() {
    let (addr, supervisor) = start_test_server(false).await;

    let (status, json) = post(addr, "/bots/alice/start", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(json["message"].as_str().unwrap().contains("alice"));

    let (status, json) = post(
        addr,
        "/bots/alice/start",
        Some(serde_json::json!({"messages_per_minute": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["detail"].as_str().unwrap().contains("already managed"));

    let (_, json) = get(addr, "/bots").await;
    assert_eq!(json["bots"].as_object().unwrap().len(), 1);
    supervisor.shutdown().await;
}

#[tokio::test]
async fn zero_or_malformed_parameters_are_unprocessable() {
    let (addr, supervisor) = start_test_server(false).await;

    let (status, _) = post(
        addr,
        "/bots/alice/start",
        Some(serde_json::json!({"sender_count": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(
        addr,
        "/bots/alice/start",
        Some(serde_json::json!({"messages_per_minute": "fast"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(supervisor.is_empty());
}

#[tokio::test]
async fn unrecognised_body_fields_are_ignored() {
    let (addr, supervisor) = start_test_server(false).await;

    let (status, _) = post(
        addr,
        "/bots/alice/start",
        Some(serde_json::json!({"messages_per_minute": 5, "note": "extra"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(supervisor.len(), 1);
    supervisor.shutdown().await;
}

#[tokio::test]
async fn unknown_channels_are_not_found() {
    let (addr, _supervisor) = start_test_server(false).await;

    let (status, json) = post(addr, "/bots/nobody/stop", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["detail"].as_str().unwrap().contains("nobody"));

    let (status, _) = get(addr, "/bots/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_list_and_stop() {
    let (addr, supervisor) = start_test_server(true).await;
    post(addr, "/bots/alice/start", None).await;

    // wait for the first probe to land
    let mut state = Value::Null;
    for _ in 0..50 {
        let (_, json) = get(addr, "/bots/alice").await;
        state = json["status"].clone();
        if state == "running" {
            assert_eq!(json["recent_messages"], serde_json::json!([]));
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state, "running");

    let (_, json) = get(addr, "/bots").await;
    assert_eq!(json, serde_json::json!({"bots": {"alice": "running"}}));

    let (status, json) = post(addr, "/bots/alice/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("stopped"));
    assert!(supervisor.is_empty());

    let (_, json) = get(addr, "/bots").await;
    assert_eq!(json, serde_json::json!({"bots": {}}));
}
