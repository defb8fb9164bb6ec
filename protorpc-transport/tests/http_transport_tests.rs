// HTTP transport tests
// Drives calls through HttpChannel against a mock server and checks the
// terminal state for each kind of reply

use futures::future::join_all;
use mockito::Matcher;
use protorpc_core::{CallState, ErrorCode, ErrorKind, MessageSchema, MethodDescriptor};
use protorpc_transport::{HttpConfig, HttpTransport, Transport};
use serde_json::json;
use std::sync::Arc;

fn say_method() -> Arc<MethodDescriptor> {
    let schema = Arc::new(
        MessageSchema::json_schema(
            "Text",
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            }),
        )
        .unwrap(),
    );
    Arc::new(MethodDescriptor::new("say", Arc::clone(&schema), schema))
}

fn transport_for(server: &mockito::ServerGuard) -> HttpTransport {
    let config = HttpConfig::new(format!("{}/rpc/Echo", server.url()))
        .with_header("Authorization", "Bearer secret-token")
        .with_timeout_ms(5000);
    HttpTransport::http(config).unwrap()
}

#[tokio::test]
async fn test_post_to_method_path_with_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rpc/Echo.say")
        .match_header("content-type", "application/json")
        .match_header("authorization", "Bearer secret-token")
        .match_body(Matcher::JsonString(r#"{"text":"hi"}"#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value":{"text":"hi"}}"#)
        .create_async()
        .await;

    let transport = transport_for(&server);
    let call = transport.send_rpc(&say_method(), json!({"text": "hi"}));

    let response = call.wait().await.unwrap();
    assert_eq!(response["text"], "hi");
    assert_eq!(call.state(), CallState::Ok);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_application_error_envelope() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/rpc/Echo.say")
        .with_status(200)
        .with_body(r#"{"error":{"code":"unauthenticated","message":"token expired"}}"#)
        .create_async()
        .await;

    let transport = transport_for(&server);
    let call = transport.send_rpc(&say_method(), json!({"text": "hi"}));

    let error = call.wait().await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Application);
    assert_eq!(error.code(), Some(ErrorCode::Unauthenticated));
    assert_eq!(error.application.unwrap().message, "token expired");
    assert!(call.response().is_none());
}

#[tokio::test]
async fn test_malformed_reply_is_server_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/rpc/Echo.say")
        .with_status(200)
        .with_body("{\"value\": {\"text\": ")
        .create_async()
        .await;

    let transport = transport_for(&server);
    let call = transport.send_rpc(&say_method(), json!({"text": "hi"}));

    assert_eq!(call.wait().await.unwrap_err().kind, ErrorKind::Server);
    assert_eq!(call.state(), CallState::ServerError);
}

#[tokio::test]
async fn test_http_failure_status_is_server_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/rpc/Echo.say")
        .with_status(502)
        .with_body("Bad Gateway")
        .create_async()
        .await;

    let transport = transport_for(&server);
    let call = transport.send_rpc(&say_method(), json!({"text": "hi"}));

    let error = call.wait().await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Server);
    assert!(error.detail.contains("502"));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let config = HttpConfig::new("http://127.0.0.1:1/rpc/Echo").with_timeout_ms(2000);
    let transport = HttpTransport::http(config).unwrap();
    let call = transport.send_rpc(&say_method(), json!({"text": "hi"}));

    let error = call.wait().await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Network);
    assert!(!error.detail.is_empty());
    assert_eq!(call.state(), CallState::NetworkError);
    assert!(call.response().is_none());
}

#[tokio::test]
async fn test_invalid_request_never_reaches_server() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let transport = transport_for(&server);
    let call = transport.send_rpc(&say_method(), json!({"text": 42}));

    assert_eq!(call.state(), CallState::RequestError);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_calls_share_transport() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rpc/Echo.say")
        .with_status(200)
        .with_body(r#"{"value":{"text":"pong"}}"#)
        .expect(5)
        .create_async()
        .await;

    let transport = transport_for(&server);
    let method = say_method();
    let calls: Vec<_> = (0..5)
        .map(|i| transport.send_rpc(&method, json!({"text": format!("ping {}", i)})))
        .collect();

    let results = join_all(calls.iter().map(|call| call.wait())).await;
    for result in results {
        assert_eq!(result.unwrap()["text"], "pong");
    }
    mock.assert_async().await;
}
