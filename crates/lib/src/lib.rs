//! dfrelay core library — a thin webhook relay between the Telegram Bot API
//! and Dialogflow CX: session affinity, request/response translation, and the
//! gateway server, used by the CLI binary.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod intent;
pub mod session;
pub mod translate;
