//! Minimal Telegram Bot API client: message delivery and update polling.

pub mod poller;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::notifications::{MessageTransport, SenderError};

/// Talks to `{api_url}/bot{token}/...`.
pub struct TelegramClient {
    client: Client,
    api_url: String,
    bot_token: String,
}

#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Chat {
    pub id: i64,
}

impl TelegramClient {
    pub fn new(api_url: &str, bot_token: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url, self.bot_token)
    }

    /// Long-polls for new updates starting at `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, SenderError> {
        let payload = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ["message"],
        };
        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(timeout + Duration::from_secs(10))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body: ApiResponse<Vec<Update>> = response.json().await?;
        if !status.is_success() || !body.ok {
            return Err(SenderError::SendFailed(format!(
                "getUpdates failed with status {status}: {}",
                body.description.unwrap_or_default()
            )));
        }
        Ok(body.result.unwrap_or_default())
    }
}

#[async_trait]
impl MessageTransport for TelegramClient {
    async fn send_message(&self, chat_ref: &str, text: &str) -> Result<(), SenderError> {
        let payload = TelegramMessage {
            chat_id: chat_ref,
            text,
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Telegram API returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Json, http::StatusCode, routing::post, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    async fn spawn_api(received: Arc<Mutex<Vec<Value>>>) -> String {
        let app = Router::new()
            .route(
                "/botTOKEN/sendMessage",
                post(move |Json(body): Json<Value>| {
                    let received = received.clone();
                    async move {
                        let blocked = body["chat_id"] == "403";
                        received.lock().unwrap().push(body);
                        if blocked {
                            (
                                StatusCode::FORBIDDEN,
                                Json(json!({"ok": false, "description": "bot was blocked by the user"})),
                            )
                        } else {
                            (StatusCode::OK, Json(json!({"ok": true, "result": {}})))
                        }
                    }
                }),
            )
            .route(
                "/botTOKEN/getUpdates",
                post(|Json(body): Json<Value>| async move {
                    let offset = body["offset"].as_i64().unwrap_or(0);
                    Json(json!({
                        "ok": true,
                        "result": [
                            {"update_id": offset, "message": {"chat": {"id": 42}, "text": "/status"}},
                            {"update_id": offset + 1, "message": {"chat": {"id": 7}}},
                            {"update_id": offset + 2}
                        ]
                    }))
                }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_send_message_posts_chat_and_text() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let api = spawn_api(received.clone()).await;
        let client = TelegramClient::new(&api, "TOKEN");

        client.send_message("42", "hello").await.unwrap();

        let bodies = received.lock().unwrap().clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["chat_id"], "42");
        assert_eq!(bodies[0]["text"], "hello");
    }

    #[tokio::test]
    async fn test_send_message_reports_api_failure() {
        let api = spawn_api(Arc::new(Mutex::new(Vec::new()))).await;
        let client = TelegramClient::new(&api, "TOKEN");

        let err = client.send_message("403", "hello").await.unwrap_err();
        assert!(matches!(err, SenderError::SendFailed(ref msg) if msg.contains("403")));
    }

    #[tokio::test]
    async fn test_get_updates_parses_messages() {
        let api = spawn_api(Arc::new(Mutex::new(Vec::new()))).await;
        let client = TelegramClient::new(&api, "TOKEN");

        let updates = client.get_updates(10, Duration::from_secs(1)).await.unwrap();

        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].update_id, 10);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.text.as_deref(), Some("/status"));
        assert!(updates[1].message.as_ref().unwrap().text.is_none());
        assert!(updates[2].message.is_none());
    }
}
