//! Messaging channel (Telegram).
//!
//! Inbound update types for the webhook body, outbound message types for the
//! Bot API send endpoints, and the connector that posts them.

mod telegram;

pub use telegram::{
    OutboundMessage, PhotoMessage, TelegramChannel, TelegramChat, TelegramError, TelegramMessage,
    TelegramUpdate, TextMessage, VoiceMessage,
};
