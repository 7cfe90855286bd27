//! Tests for the reqwest HTTP transport with a mock backend

use modelroute_core::executor::http::HttpTransport;
use modelroute_core::executor::transport::{InvocationTransport, TransportError};
use modelroute_core::registry::record::{CostTier, ProviderCategory, ProviderRecord, ResolvedRoute};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn route_to(server: &MockServer) -> ResolvedRoute {
    let record = ProviderRecord::new(ProviderCategory::Custom, "mock")
        .with_endpoint(format!("{}/v1/chat", server.uri()))
        .with_model("mock-model")
        .with_credential("sk-mock")
        .with_param("temperature", json!(0.2))
        .valid();
    ResolvedRoute::from_record(&record, CostTier::Standard)
}

#[tokio::test]
async fn test_successful_invocation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(header("authorization", "Bearer sk-mock"))
        .and(body_partial_json(json!({
            "model": "mock-model",
            "temperature": 0.2,
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "hello"}}]
        })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let payload = json!({"messages": [{"role": "user", "content": "hi"}]});
    let response = transport
        .invoke(&route_to(&server), &payload, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(response["choices"][0]["message"]["content"], json!("hello"));
}

#[tokio::test]
async fn test_no_auth_header_for_empty_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let record = ProviderRecord::new(ProviderCategory::Local, "local")
        .with_endpoint(format!("{}/v1/chat", server.uri()))
        .with_model("local-model")
        .valid();
    let route = ResolvedRoute::from_record(&record, CostTier::Standard);

    let transport = HttpTransport::new().unwrap();
    transport
        .invoke(&route, &json!({}), Duration::from_secs(5))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_auth_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let err = transport
        .invoke(&route_to(&server), &json!({}), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Auth));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_rate_limit_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429).set_body_string("{\"retry_after\": 2}"),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let err = transport
        .invoke(&route_to(&server), &json!({}), Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        TransportError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(2)));
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let err = transport
        .invoke(&route_to(&server), &json!({}), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Server { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_bad_request_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("unknown field"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let err = transport
        .invoke(&route_to(&server), &json!({}), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::InvalidRequest { .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_request_timeout_maps_to_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let err = transport
        .invoke(&route_to(&server), &json!({}), Duration::from_millis(200))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let record = ProviderRecord::new(ProviderCategory::Local, "nothing-here")
        .with_endpoint("http://127.0.0.1:1/v1/chat")
        .with_model("m")
        .valid();
    let route = ResolvedRoute::from_record(&record, CostTier::Standard);

    let transport = HttpTransport::new().unwrap();
    let err = transport
        .invoke(&route, &json!({}), Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Network { .. }));
    assert!(err.is_transient());
}
