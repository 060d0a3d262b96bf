//! Dialogflow CX detect-intent wire types and client.
//!
//! The relay only uses the small detectIntent slice of the CX v3 REST API:
//! a text query addressed to a session, answered by an ordered list of
//! response messages (plain text or custom payload).

mod dialogflow;

pub use dialogflow::{DialogflowClient, DialogflowError};

use serde::{Deserialize, Serialize};

/// Request body for `POST {session}:detectIntent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectIntentRequest {
    /// Fully-qualified session resource name.
    pub session: String,
    pub query_input: QueryInput,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInput {
    pub text: TextInput,
    pub language_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextInput {
    pub text: String,
}

/// Response body for detectIntent; only the response messages are consumed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectIntentResponse {
    #[serde(default)]
    pub query_result: QueryResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub response_messages: Vec<ResponseSegment>,
}

/// One unit of the agent's reply, tagged by which field is present.
///
/// Segments carrying neither `text` nor `payload` (e.g. outputAudioText,
/// liveAgentHandoff) fall into `Other` and are skipped by the translator.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponseSegment {
    Text { text: TextLines },
    Payload { payload: serde_json::Value },
    Other(serde_json::Value),
}

/// The CX text message shape: a list of line fragments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextLines {
    #[serde(default)]
    pub text: Vec<String>,
}
