//! Request/response translation between Telegram and Dialogflow CX.
//!
//! Inbound: chat text plus a resolved session becomes a detectIntent request.
//! Outbound: the agent's response messages fan out to zero or more Bot API
//! send requests, in the order the agent produced them.

use crate::channels::{OutboundMessage, PhotoMessage, TextMessage, VoiceMessage};
use crate::intent::{DetectIntentRequest, QueryInput, ResponseSegment, TextInput};
use serde::Deserialize;

/// Build the detectIntent request for one inbound chat message.
///
/// Pure assembly; callers must skip the pipeline entirely when the update
/// carries no text.
pub fn detect_intent_request(
    session_path: String,
    message_text: &str,
    language_code: &str,
) -> DetectIntentRequest {
    DetectIntentRequest {
        session: session_path,
        query_input: QueryInput {
            text: TextInput {
                text: message_text.to_string(),
            },
            language_code: language_code.to_string(),
        },
    }
}

/// Recognized custom-payload shapes. The layouts match the Bot API bodies the
/// agent is expected to emit:
/// buttons/photos <https://core.telegram.org/bots/api#sendphoto>,
/// voice audio <https://core.telegram.org/bots/api#sendvoice>.
#[derive(Debug, Deserialize)]
struct PayloadBody {
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    voice: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("payload has no recognized kind (expected photo, voice, or text)")]
    Unrecognized,
    #[error("payload decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Decode one custom payload into an outbound message. Exactly one decode per
/// payload; which recognized field is present determines the message kind.
fn decode_payload(
    payload: &serde_json::Value,
    chat_id: i64,
) -> Result<OutboundMessage, PayloadError> {
    if !payload.is_object() {
        return Err(PayloadError::NotAnObject);
    }
    let body: PayloadBody = serde_json::from_value(payload.clone())?;
    if let Some(photo) = body.photo {
        Ok(OutboundMessage::Photo(PhotoMessage {
            chat_id,
            photo,
            caption: body.caption,
        }))
    } else if let Some(voice) = body.voice {
        Ok(OutboundMessage::Voice(VoiceMessage {
            chat_id,
            voice,
            caption: body.caption,
        }))
    } else if let Some(text) = body.text {
        Ok(OutboundMessage::Text(TextMessage { chat_id, text }))
    } else {
        Err(PayloadError::Unrecognized)
    }
}

/// Translate the agent's response messages into Bot API send requests,
/// preserving segment order.
///
/// Text segments join their line fragments into one message body. Payload
/// segments decode into the message kind their recognized field selects;
/// malformed or unrecognized payloads are logged and skipped without
/// aborting the rest of the batch. Segments of any other kind contribute
/// nothing.
pub fn to_outbound_messages(segments: &[ResponseSegment], chat_id: i64) -> Vec<OutboundMessage> {
    let mut messages = Vec::new();
    for segment in segments {
        match segment {
            ResponseSegment::Text { text } => {
                messages.push(OutboundMessage::Text(TextMessage {
                    chat_id,
                    text: text.text.concat(),
                }));
            }
            ResponseSegment::Payload { payload } => match decode_payload(payload, chat_id) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    log::warn!("skipping custom payload for chat {}: {}", chat_id, e);
                }
            },
            ResponseSegment::Other(_) => {}
        }
    }
    messages
}
