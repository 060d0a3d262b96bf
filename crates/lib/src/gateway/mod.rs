//! Webhook gateway HTTP server.

mod server;

pub use server::{run_gateway, RelayState};
