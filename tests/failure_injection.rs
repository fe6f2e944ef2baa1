//! Failure injection tests for the upstream resilience path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

mod common;

use common::{completion_body, start_gateway, start_gateway_with_observer, test_config, MockUpstream};
use scope_gateway::observability::{RecordingObserver, RetryOutcome};
use scope_gateway::ErrorKind;

async fn post_completion(addr: std::net::SocketAddr, body: Value) -> (StatusCode, Value) {
    let res = reqwest::Client::new()
        .post(format!("http://{addr}/api/completion"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = StatusCode::from_u16(res.status().as_u16()).unwrap();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_rate_limited_upstream_recovers_on_third_attempt() {
    let llm = MockUpstream::start(|call| {
        if call < 2 {
            Some((429, json!({ "error": { "message": "slow down" } }).to_string()))
        } else {
            Some((200, completion_body("recovered")))
        }
    })
    .await;

    let (addr, shutdown) = start_gateway(test_config(&llm.url(), "http://127.0.0.1:9")).await;
    let (status, body) = post_completion(addr, json!({ "prompt": "hi" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "recovered");
    assert_eq!(llm.calls(), 3);
    shutdown.trigger();
}

#[tokio::test]
async fn test_attempts_are_reported_to_observer() {
    let llm = MockUpstream::start(|call| {
        if call == 0 {
            Some((502, "bad gateway".to_string()))
        } else {
            Some((200, completion_body("ok")))
        }
    })
    .await;

    let observer = Arc::new(RecordingObserver::new());
    let (addr, shutdown) =
        start_gateway_with_observer(test_config(&llm.url(), "http://127.0.0.1:9"), observer.clone()).await;
    let (status, _) = post_completion(addr, json!({ "prompt": "hi" })).await;
    assert_eq!(status, StatusCode::OK);

    let attempts = observer.attempts_for("llm.completion");
    assert_eq!(attempts.len(), 2);
    let failure = attempts[0].error.as_ref().unwrap();
    assert_eq!(failure.kind, ErrorKind::UpstreamHttp);
    assert!(failure.retryable);
    assert_eq!(attempts[0].next_delay, Some(Duration::from_millis(1)));
    assert!(attempts[1].error.is_none());
    assert_eq!(
        observer.outcomes(),
        vec![("llm.completion".to_string(), RetryOutcome::Succeeded { attempts: 2 })]
    );
    shutdown.trigger();
}

#[tokio::test]
async fn test_persistent_server_error_exhausts_attempts() {
    let llm = MockUpstream::fixed(503, json!({ "error": "overloaded" })).await;

    let (addr, shutdown) = start_gateway(test_config(&llm.url(), "http://127.0.0.1:9")).await;
    let (status, body) = post_completion(addr, json!({ "prompt": "hi" })).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "upstream_http");
    assert_eq!(body["status"], 503);
    assert_eq!(llm.calls(), 3);
    shutdown.trigger();
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let llm = MockUpstream::fixed(400, json!({ "error": { "message": "bad model" } })).await;

    let (addr, shutdown) = start_gateway(test_config(&llm.url(), "http://127.0.0.1:9")).await;
    let (status, body) = post_completion(addr, json!({ "prompt": "hi", "model": "nope" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "upstream_http");
    assert_eq!(llm.calls(), 1);
    shutdown.trigger();
}

#[tokio::test]
async fn test_unresponsive_upstream_times_out() {
    let llm = MockUpstream::start(|_| None).await;

    let mut config = test_config(&llm.url(), "http://127.0.0.1:9");
    config.timeouts.upstream_ms = 200;
    config.retries.max_attempts = 1;

    let (addr, shutdown) = start_gateway(config).await;
    let started = Instant::now();
    let (status, body) = post_completion(addr, json!({ "prompt": "hi" })).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["code"], "timeout");
    assert!(body["error"].as_str().unwrap().contains("timed out after 200ms"));
    assert!(started.elapsed() < Duration::from_secs(5));
    shutdown.trigger();
}

#[tokio::test]
async fn test_request_deadline_is_structured_timeout() {
    let llm = MockUpstream::start(|_| None).await;

    let mut config = test_config(&llm.url(), "http://127.0.0.1:9");
    config.timeouts.request_secs = 1;
    config.timeouts.upstream_ms = 5_000;
    config.retries.max_attempts = 1;
    assert!(scope_gateway::config::validation::validate_config(&config).is_err());

    let (addr, shutdown) = start_gateway(config).await;
    let res = reqwest::Client::new()
        .post(format!("http://{addr}/api/completion"))
        .json(&json!({ "prompt": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 504);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "timeout");
    assert_eq!(body["error"], "request timed out after 1s");
    shutdown.trigger();
}

#[tokio::test]
async fn test_timeout_is_retried_per_attempt() {
    let llm = MockUpstream::start(|call| {
        if call == 0 {
            None
        } else {
            Some((200, completion_body("second try")))
        }
    })
    .await;

    let mut config = test_config(&llm.url(), "http://127.0.0.1:9");
    config.timeouts.upstream_ms = 200;

    let (addr, shutdown) = start_gateway(config).await;
    let (status, body) = post_completion(addr, json!({ "prompt": "hi" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "second try");
    assert_eq!(llm.calls(), 2);
    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let (addr, shutdown) = start_gateway(test_config(&format!("http://{closed}"), "http://127.0.0.1:9")).await;
    let (status, body) = post_completion(addr, json!({ "prompt": "hi" })).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "upstream_http");
    assert_eq!(body["error"], "llm is unreachable");
    assert!(!body.to_string().contains(&closed.to_string()));
    shutdown.trigger();
}

#[tokio::test]
async fn test_missing_key_is_configuration_error_and_server_keeps_serving() {
    let llm = MockUpstream::fixed(200, json!({})).await;

    let mut config = test_config(&llm.url(), "http://127.0.0.1:9");
    config.llm.api_key = None;

    let (addr, shutdown) = start_gateway(config).await;
    let (status, body) = post_completion(addr, json!({ "prompt": "hi" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "configuration");
    assert_eq!(body["error"], "Missing configuration: LLM_API_KEY");
    assert_eq!(llm.calls(), 0);

    let health = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(health.status().as_u16(), 200);
    shutdown.trigger();
}

#[tokio::test]
async fn test_missing_scopestack_token_names_setting() {
    let scopestack = MockUpstream::fixed(200, json!({})).await;

    let mut config = test_config("http://127.0.0.1:9", &scopestack.url());
    config.scopestack.api_token = None;

    let (addr, shutdown) = start_gateway(config).await;
    let res = reqwest::get(format!("http://{addr}/api/scopestack/account")).await.unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "configuration");
    assert_eq!(body["error"], "Missing configuration: SCOPESTACK_API_TOKEN");
    assert_eq!(scopestack.calls(), 0);
    shutdown.trigger();
}
