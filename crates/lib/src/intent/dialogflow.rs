//! Dialogflow CX REST client (regional endpoint, detectIntent only).

use crate::config::DialogflowConfig;
use crate::intent::{DetectIntentRequest, DetectIntentResponse, ResponseSegment};

/// Client for the Dialogflow CX v3 REST API.
#[derive(Clone)]
pub struct DialogflowClient {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum DialogflowError {
    #[error("dialogflow request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("dialogflow api error: {0}")]
    Api(String),
}

impl DialogflowClient {
    /// Build a client for the agent's regional endpoint
    /// (`https://{location}-dialogflow.googleapis.com/v3`).
    /// DIALOGFLOW_API_BASE overrides the endpoint (for tests or proxies).
    pub fn new(config: &DialogflowConfig) -> Self {
        let base_url = std::env::var("DIALOGFLOW_API_BASE")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                format!("https://{}-dialogflow.googleapis.com/v3", config.location)
            });
        Self {
            base_url,
            access_token: config.access_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// POST `{base}/{session}:detectIntent` — returns the agent's response
    /// messages in the order the service produced them.
    pub async fn detect_intent(
        &self,
        request: &DetectIntentRequest,
    ) -> Result<Vec<ResponseSegment>, DialogflowError> {
        let url = format!("{}/{}:detectIntent", self.base_url, request.session);
        let mut req = self.client.post(&url).json(request);
        if let Some(ref token) = self.access_token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DialogflowError::Api(format!("{} {}", status, body)));
        }
        let data: DetectIntentResponse = res.json().await?;
        Ok(data.query_result.response_messages)
    }
}
