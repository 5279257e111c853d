use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::Query;
use axum::http::StatusCode as AxumStatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use webhook_relay_adapter_axum::{RelayAxumService, RelayServer, RelayServerConfig};
use webhook_relay_core::app::build_router;
use webhook_relay_core::config::StaticConfig;
use webhook_relay_core::manifest::{RelaySettings, DEFAULT_WEBHOOK_ENV};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn start_upstream() -> TestServer {
    let router = Router::new()
        .route(
            "/webhook",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let message = params.get("message").cloned().unwrap_or_default();
                Json(json!({ "reply": format!("echo: {message}"), "turn": 1 }))
            }),
        )
        .route(
            "/unavailable",
            get(|| async { (AxumStatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        )
        .route("/not-json", get(|| async { "plain text reply" }));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    TestServer {
        base_url: format!("http://{addr}"),
        handle,
    }
}

async fn start_relay(config: StaticConfig) -> TestServer {
    let router = build_router(&RelaySettings::default());
    let service = RelayAxumService::new(router).with_config_provider(config);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
    let addr: SocketAddr = listener.local_addr().expect("relay addr");
    let server = RelayServer::with_config(
        service,
        RelayServerConfig {
            addr,
            enable_ctrl_c: false,
        },
    );
    let handle = tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    TestServer {
        base_url: format!("http://{addr}"),
        handle,
    }
}

fn webhook_config(url: String) -> StaticConfig {
    StaticConfig::new().with(DEFAULT_WEBHOOK_ENV, url)
}

async fn send_with_retry<F>(client: &reqwest::Client, mut make_request: F) -> reqwest::Response
where
    F: FnMut(&reqwest::Client) -> reqwest::RequestBuilder,
{
    let start = Instant::now();
    let timeout = Duration::from_secs(2);

    loop {
        match make_request(client).send().await {
            Ok(response) => return response,
            Err(err) => {
                if start.elapsed() >= timeout {
                    panic!("server did not respond before timeout: {}", err);
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn get_json(url: &str) -> (reqwest::StatusCode, Value) {
    let client = reqwest::Client::new();
    let response = send_with_retry(&client, |client| client.get(url)).await;
    let status = response.status();
    let bytes = response.bytes().await.expect("response body");
    let body = serde_json::from_slice::<Value>(&bytes).expect("json body");
    (status, body)
}

#[tokio::test(flavor = "multi_thread")]
async fn relays_upstream_json_on_success() {
    let upstream = start_upstream().await;
    let relay = start_relay(webhook_config(format!("{}/webhook", upstream.base_url))).await;

    let (status, body) = get_json(&format!("{}/api/chat?message=hello", relay.base_url)).await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, json!({ "reply": "echo: hello", "turn": 1 }));
}

#[tokio::test(flavor = "multi_thread")]
async fn encodes_message_for_upstream() {
    let upstream = start_upstream().await;
    let relay = start_relay(webhook_config(format!("{}/webhook", upstream.base_url))).await;

    let (status, body) = get_json(&format!(
        "{}/api/chat?message=hello%20world%20%26%20more%3F",
        relay.base_url
    ))
    .await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["reply"], "echo: hello world & more?");
}

#[tokio::test(flavor = "multi_thread")]
async fn upstream_error_status_becomes_backend_failure() {
    let upstream = start_upstream().await;
    let relay = start_relay(webhook_config(format!(
        "{}/unavailable",
        upstream.base_url
    )))
    .await;

    let (status, body) = get_json(&format!("{}/api/chat?message=hi", relay.base_url)).await;

    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to connect to backend" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn non_json_upstream_body_becomes_backend_failure() {
    let upstream = start_upstream().await;
    let relay = start_relay(webhook_config(format!("{}/not-json", upstream.base_url))).await;

    let (status, body) = get_json(&format!("{}/api/chat?message=hi", relay.base_url)).await;

    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to connect to backend" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_upstream_becomes_backend_failure() {
    let relay = start_relay(webhook_config("http://127.0.0.1:1/webhook".to_string())).await;

    let (status, body) = get_json(&format!("{}/api/chat?message=hi", relay.base_url)).await;

    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to connect to backend" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_webhook_url_is_reported() {
    let relay = start_relay(StaticConfig::new()).await;

    let (status, body) = get_json(&format!("{}/api/chat?message=hi", relay.base_url)).await;

    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Webhook URL not configured" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_message_is_rejected() {
    let upstream = start_upstream().await;
    let relay = start_relay(webhook_config(format!("{}/webhook", upstream.base_url))).await;

    for url in [
        format!("{}/api/chat", relay.base_url),
        format!("{}/api/chat?message=", relay.base_url),
    ] {
        let (status, body) = get_json(&url).await;
        assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Message parameter is required" }));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn non_get_methods_are_rejected_before_configuration() {
    let relay = start_relay(StaticConfig::new()).await;

    let client = reqwest::Client::new();
    let url = format!("{}/api/chat?message=hi", relay.base_url);
    let response = send_with_retry(&client, |client| client.post(url.as_str())).await;

    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
    let bytes = response.bytes().await.expect("response body");
    let body = serde_json::from_slice::<Value>(&bytes).expect("json body");
    assert_eq!(body, json!({ "error": "Method not allowed" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn health_probe_answers_ok() {
    let relay = start_relay(StaticConfig::new()).await;

    let (status, body) = get_json(&format!("{}/healthz", relay.base_url)).await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
