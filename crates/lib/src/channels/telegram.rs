//! Telegram channel: webhook registration and sendMessage/sendPhoto/sendVoice via Bot API.

use serde::{Deserialize, Serialize};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram update payload (webhook POST body).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// A fully formed send request for one unit of content, serialized as the
/// Bot API request body for the endpoint `endpoint()` names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Text(TextMessage),
    Photo(PhotoMessage),
    Voice(VoiceMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
    pub chat_id: i64,
    pub text: String,
}

/// Body for sendPhoto: <https://core.telegram.org/bots/api#sendphoto>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoMessage {
    pub chat_id: i64,
    /// File id or URL of the photo.
    pub photo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Body for sendVoice: <https://core.telegram.org/bots/api#sendvoice>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceMessage {
    pub chat_id: i64,
    /// File id or URL of the voice recording.
    pub voice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl OutboundMessage {
    /// Bot API method the message must be posted to.
    pub fn endpoint(&self) -> &'static str {
        match self {
            OutboundMessage::Text(_) => "sendMessage",
            OutboundMessage::Photo(_) => "sendPhoto",
            OutboundMessage::Voice(_) => "sendVoice",
        }
    }

    /// Target chat.
    pub fn chat_id(&self) -> i64 {
        match self {
            OutboundMessage::Text(m) => m.chat_id,
            OutboundMessage::Photo(m) => m.chat_id,
            OutboundMessage::Voice(m) => m.chat_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("telegram api error: {0}")]
    Api(String),
}

/// Telegram channel connector: registers the webhook and posts outbound messages.
pub struct TelegramChannel {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// TELEGRAM_API_BASE overrides the Bot API endpoint (for tests or proxies).
    pub fn new(token: String) -> Self {
        let base_url = std::env::var("TELEGRAM_API_BASE")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| TELEGRAM_API_BASE.to_string());
        Self {
            token,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Post one outbound message to the endpoint its kind selects.
    pub async fn send(&self, message: &OutboundMessage) -> Result<(), TelegramError> {
        let url = self.method_url(message.endpoint());
        let res = self.client.post(&url).json(message).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(TelegramError::Api(format!(
                "{} failed: {} {}",
                message.endpoint(),
                status,
                body
            )));
        }
        Ok(())
    }

    /// Register the webhook URL so Telegram POSTs updates to us.
    pub async fn set_webhook(&self, url: &str) -> Result<(), TelegramError> {
        let api_url = self.method_url("setWebhook");
        let body = serde_json::json!({ "url": url });
        let res = self.client.post(&api_url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(TelegramError::Api(format!(
                "setWebhook failed: {} {}",
                status, body
            )));
        }
        Ok(())
    }

    /// Remove the webhook (on shutdown) so the bot can be re-pointed cleanly.
    pub async fn delete_webhook(&self) -> Result<(), TelegramError> {
        let url = self.method_url("deleteWebhook");
        let res = self.client.post(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(TelegramError::Api(format!(
                "deleteWebhook failed: {} {}",
                status, body
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_selected_by_message_kind() {
        let text = OutboundMessage::Text(TextMessage {
            chat_id: 1,
            text: "hi".to_string(),
        });
        let photo = OutboundMessage::Photo(PhotoMessage {
            chat_id: 1,
            photo: "https://example.com/cat.jpg".to_string(),
            caption: None,
        });
        let voice = OutboundMessage::Voice(VoiceMessage {
            chat_id: 1,
            voice: "https://example.com/hello.ogg".to_string(),
            caption: Some("hello".to_string()),
        });
        assert_eq!(text.endpoint(), "sendMessage");
        assert_eq!(photo.endpoint(), "sendPhoto");
        assert_eq!(voice.endpoint(), "sendVoice");
    }

    #[test]
    fn outbound_serializes_as_flat_api_body() {
        let msg = OutboundMessage::Photo(PhotoMessage {
            chat_id: 99,
            photo: "https://example.com/cat.jpg".to_string(),
            caption: None,
        });
        let body = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({ "chat_id": 99, "photo": "https://example.com/cat.jpg" })
        );
    }
}
