mod common;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use bandruption::{
    server::{self, PopupChannel},
    spotify::{BrowserOpener, MessageBus},
    types::{CallbackResponse, Product},
};
use common::*;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::{net::TcpListener, time::timeout};

async fn spawn_server(api: Arc<FakeApi>, bus: MessageBus) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let channel = PopupChannel {
        bus,
        opener: BrowserOpener::new(),
    };
    tokio::spawn(server::serve(listener, server::router(api, channel)));
    addr
}

#[tokio::test]
async fn test_health_reports_service() {
    let addr = spawn_server(Arc::new(FakeApi::new()), MessageBus::new()).await;

    let body: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["service"], "bandruption");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_message_is_tagged_with_request_origin() {
    let bus = MessageBus::new();
    let mut listener = bus.subscribe();
    let addr = spawn_server(Arc::new(FakeApi::new()), bus.clone()).await;
    let payload = success_message("u1", "tok", "premium");

    let res = reqwest::Client::new()
        .post(format!("http://{}/message", addr))
        .header("Origin", ORIGIN)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let message = timeout(Duration::from_secs(5), listener.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.origin, ORIGIN);
    assert_eq!(message.data, payload);
}

#[tokio::test]
async fn test_message_without_origin_has_empty_origin() {
    let bus = MessageBus::new();
    let mut listener = bus.subscribe();
    let addr = spawn_server(Arc::new(FakeApi::new()), bus.clone()).await;

    reqwest::Client::new()
        .post(format!("http://{}/message", addr))
        .json(&json!({ "type": "error", "error": "x" }))
        .send()
        .await
        .unwrap();

    let message = timeout(Duration::from_secs(5), listener.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.origin, "");
}

#[tokio::test]
async fn test_callback_redeems_code_once() {
    let api = Arc::new(FakeApi::new());
    *api.callback.lock().unwrap() = CallbackResponse {
        success: true,
        user_id: Some("u1".to_string()),
        access_token: Some("tok".to_string()),
        user_data: Some(profile("u1", Some(Product::Premium))),
        ..Default::default()
    };
    let addr = spawn_server(Arc::clone(&api), MessageBus::new()).await;

    let page = reqwest::get(format!("http://{}/callback?code=abc&state=xyz", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(
        *api.exchanges.lock().unwrap(),
        vec![("abc".to_string(), "xyz".to_string())]
    );
    assert!(page.contains("Authentication successful."));
    assert!(page.contains(r#""type":"success""#));
    assert!(page.contains(r#""accessToken":"tok""#));
}

#[tokio::test]
async fn test_callback_with_provider_error() {
    let api = Arc::new(FakeApi::new());
    let addr = spawn_server(Arc::clone(&api), MessageBus::new()).await;

    let page = reqwest::get(format!("http://{}/callback?error=access_denied", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(api.exchanges.lock().unwrap().is_empty());
    assert!(page.contains("Authentication failed."));
    assert!(page.contains(r#""error":"access_denied""#));
}

#[tokio::test]
async fn test_callback_without_code() {
    let addr = spawn_server(Arc::new(FakeApi::new()), MessageBus::new()).await;

    let page = reqwest::get(format!("http://{}/callback", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(page.contains("Missing authorization code"));
}

#[tokio::test]
async fn test_closed_beacon_is_accepted() {
    let addr = spawn_server(Arc::new(FakeApi::new()), MessageBus::new()).await;

    let res = reqwest::Client::new()
        .post(format!("http://{}/closed", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}
