//! Integration test: boot the gateway against a fake Telegram/Dialogflow
//! upstream on localhost and drive it through the webhook endpoint.
//! The server tasks are left running when the test ends.

use axum::{body::Bytes, http::StatusCode, http::Uri, response::Json, Router};
use lib::config::Config;
use lib::gateway;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const BOT_TOKEN: &str = "test-token";

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

/// One fake upstream serves both APIs: paths ending in `:detectIntent` answer
/// as Dialogflow, `/bot{token}/...` paths answer as the Bot API. Every call
/// is recorded as (path, body).
async fn start_fake_upstream() -> (u16, CallLog) {
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    let log = calls.clone();
    let handler = move |uri: Uri, body: Bytes| {
        let log = log.clone();
        async move {
            let path = uri.path().to_string();
            let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            log.lock().await.push((path.clone(), body.clone()));
            if path.ends_with(":detectIntent") {
                let text = body
                    .pointer("/queryInput/text/text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                if text == "boom" {
                    return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})));
                }
                let response = json!({
                    "queryResult": {
                        "responseMessages": [
                            { "text": { "text": ["Hello, ", "world!"] } },
                            { "payload": { "photo": "https://example.com/cat.jpg" } },
                            { "payload": ["malformed"] },
                        ]
                    }
                });
                return (StatusCode::OK, Json(response));
            }
            (StatusCode::OK, Json(json!({ "ok": true })))
        }
    };
    let app = Router::new().fallback(handler);
    let port = free_port();
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .expect("bind fake upstream");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (port, calls)
}

async fn wait_for_health(client: &reqwest::Client, port: u16) {
    let url = format!("http://127.0.0.1:{}/", port);
    for _ in 0..100 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway did not become healthy at {}", url);
}

fn update_with_text(update_id: i64, chat_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": { "chat": { "id": chat_id }, "text": text }
    })
}

#[tokio::test]
async fn webhook_relay_end_to_end() {
    let (upstream_port, calls) = start_fake_upstream().await;
    let base = format!("http://127.0.0.1:{}", upstream_port);
    std::env::set_var("TELEGRAM_API_BASE", &base);
    std::env::set_var("DIALOGFLOW_API_BASE", &base);
    std::env::set_var("TELEGRAM_BOT_TOKEN", BOT_TOKEN);

    let port = free_port();
    let mut config = Config::default();
    config.gateway.port = port;
    config.gateway.bind = "127.0.0.1".to_string();
    config.telegram.server_url = Some(format!("http://127.0.0.1:{}", port));
    config.dialogflow.project_id = "proj".to_string();
    config.dialogflow.location = "us-central1".to_string();
    config.dialogflow.agent_id = "agent".to_string();

    tokio::spawn(async move {
        let _ = gateway::run_gateway(config).await;
    });

    let client = reqwest::Client::new();
    wait_for_health(&client, port).await;

    // Startup registered the webhook with the public URL.
    {
        let calls = calls.lock().await;
        let set_webhook = calls
            .iter()
            .find(|(path, _)| path.ends_with("/setWebhook"))
            .expect("setWebhook was called at startup");
        assert_eq!(set_webhook.0, format!("/bot{}/setWebhook", BOT_TOKEN));
        assert_eq!(
            set_webhook.1.pointer("/url").and_then(|v| v.as_str()),
            Some(format!("http://127.0.0.1:{}/webhook/{}", port, BOT_TOKEN).as_str())
        );
    }
    calls.lock().await.clear();

    let webhook_url = format!("http://127.0.0.1:{}/webhook/{}", port, BOT_TOKEN);

    // A text update fans out: detectIntent, then the translated sends in
    // segment order. The malformed payload segment is dropped.
    let resp = client
        .post(&webhook_url)
        .json(&update_with_text(1, 42, "hi"))
        .send()
        .await
        .expect("post update");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let first_session;
    {
        let calls = calls.lock().await;
        assert_eq!(calls.len(), 3, "expected detectIntent + two sends: {:?}", calls);
        assert!(calls[0].0.ends_with(":detectIntent"));
        assert!(
            calls[0].0.contains("/projects/proj/locations/us-central1/agents/agent/sessions/telegram-42-"),
            "unexpected session path: {}",
            calls[0].0
        );
        assert_eq!(
            calls[0].1.pointer("/queryInput/languageCode").and_then(|v| v.as_str()),
            Some("en")
        );
        assert_eq!(calls[1].0, format!("/bot{}/sendMessage", BOT_TOKEN));
        assert_eq!(
            calls[1].1.pointer("/text").and_then(|v| v.as_str()),
            Some("Hello, world!")
        );
        assert_eq!(calls[1].1.pointer("/chat_id").and_then(|v| v.as_i64()), Some(42));
        assert_eq!(calls[2].0, format!("/bot{}/sendPhoto", BOT_TOKEN));
        assert_eq!(
            calls[2].1.pointer("/photo").and_then(|v| v.as_str()),
            Some("https://example.com/cat.jpg")
        );
        first_session = calls[0].0.clone();
    }
    calls.lock().await.clear();

    // Same chat within the TTL reuses the same session path.
    client
        .post(&webhook_url)
        .json(&update_with_text(2, 42, "hi again"))
        .send()
        .await
        .expect("post second update");
    {
        let calls = calls.lock().await;
        assert_eq!(calls[0].0, first_session);
    }

    calls.lock().await.clear();

    // A different chat gets its own session.
    client
        .post(&webhook_url)
        .json(&update_with_text(3, 43, "hi"))
        .send()
        .await
        .expect("post other-chat update");
    {
        let calls = calls.lock().await;
        let other_session = &calls
            .iter()
            .find(|(path, _)| path.ends_with(":detectIntent"))
            .expect("detectIntent was called")
            .0;
        assert!(
            other_session.contains("/sessions/telegram-43-"),
            "unexpected session path: {}",
            other_session
        );
    }
    calls.lock().await.clear();

    // An update without text is a no-op: 200, zero upstream calls.
    let resp = client
        .post(&webhook_url)
        .json(&json!({ "update_id": 4, "message": { "chat": { "id": 42 } } }))
        .send()
        .await
        .expect("post textless update");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert!(calls.lock().await.is_empty());

    // Intent failure surfaces as 500 so Telegram redelivers.
    let resp = client
        .post(&webhook_url)
        .json(&update_with_text(5, 42, "boom"))
        .send()
        .await
        .expect("post failing update");
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    calls.lock().await.clear();

    // The token in the path is the shared secret.
    let resp = client
        .post(format!("http://127.0.0.1:{}/webhook/wrong-token", port))
        .json(&update_with_text(6, 42, "hi"))
        .send()
        .await
        .expect("post with wrong token");
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    assert!(calls.lock().await.is_empty());
}
