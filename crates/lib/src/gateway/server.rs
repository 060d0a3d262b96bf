//! Gateway HTTP server: receives Telegram webhook updates, runs the
//! detect-intent pipeline, and posts the translated replies.

use crate::channels::{TelegramChannel, TelegramUpdate};
use crate::config::{self, Config};
use crate::intent::DialogflowClient;
use crate::session::SessionStore;
use crate::translate;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Shared state for the relay (config, session cache, outbound clients).
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<Config>,
    /// Bot token; doubles as the webhook path secret.
    bot_token: Arc<String>,
    pub sessions: Arc<SessionStore>,
    pub telegram: Arc<TelegramChannel>,
    pub dialogflow: DialogflowClient,
}

/// Run the webhook gateway; binds to config.gateway.bind:config.gateway.port.
/// Registers the Telegram webhook at startup when a public server URL is
/// configured, and removes it again on graceful shutdown.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let bot_token = config::resolve_bot_token(&config)
        .context("telegram bot token not configured (set TELEGRAM_BOT_TOKEN or telegram.botToken)")?;
    let server_url = config::resolve_server_url(&config);

    let ttl = Duration::from_secs(config.session.ttl_minutes * 60);
    let state = RelayState {
        config: Arc::new(config.clone()),
        bot_token: Arc::new(bot_token.clone()),
        sessions: Arc::new(SessionStore::new(ttl)),
        telegram: Arc::new(TelegramChannel::new(bot_token.clone())),
        dialogflow: DialogflowClient::new(&config.dialogflow),
    };

    match server_url {
        Some(ref base) => {
            let webhook_url = format!("{}/webhook/{}", base, bot_token);
            log::info!("setting telegram webhook to {}/webhook/<token>", base);
            if let Err(e) = state.telegram.set_webhook(&webhook_url).await {
                log::warn!("telegram set_webhook failed: {}", e);
            }
        }
        None => {
            log::warn!("no server URL configured; telegram webhook not registered");
        }
    }

    spawn_session_sweep(state.sessions.clone());

    let telegram_for_shutdown = state.telegram.clone();
    let app = Router::new()
        .route("/", get(health_http))
        .route("/webhook/:token", post(telegram_webhook))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.gateway.bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(telegram_for_shutdown))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Periodically drop expired session entries. The sweep only deletes; the
/// request path never waits on it.
fn spawn_session_sweep(sessions: Arc<SessionStore>) {
    let period = sessions.ttl().min(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let removed = sessions.remove_expired().await;
            if removed > 0 {
                log::debug!("session sweep removed {} expired entries", removed);
            }
        }
    });
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Removes the Telegram webhook so the bot can be re-pointed cleanly.
async fn shutdown_signal(telegram: Arc<TelegramChannel>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");

    if let Err(e) = telegram.delete_webhook().await {
        log::debug!("telegram delete_webhook on shutdown: {}", e);
    }
}

/// POST /webhook/{token} — receives a Telegram update and runs the pipeline:
/// resolve session, detect intent, translate, send each reply in order.
///
/// 200 for handled (or intentionally skipped) updates, 500 when the intent
/// call fails so Telegram redelivers the update.
async fn telegram_webhook(
    State(state): State<RelayState>,
    Path(token): Path<String>,
    body: Bytes,
) -> StatusCode {
    if token != *state.bot_token {
        return StatusCode::NOT_FOUND;
    }
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            log::debug!("ignoring unparseable webhook body: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    let Some(ref msg) = update.message else {
        return StatusCode::OK;
    };
    let Some(ref text) = msg.text else {
        log::debug!("update {} has no text, skipping", update.update_id);
        return StatusCode::OK;
    };
    let chat_id = msg.chat.id;
    log::info!("processing update {} for chat {}", update.update_id, chat_id);

    let session_id = state.sessions.resolve(chat_id).await;
    let request = translate::detect_intent_request(
        state.config.dialogflow.session_path(&session_id),
        text,
        &state.config.dialogflow.language_code,
    );
    let segments = match state.dialogflow.detect_intent(&request).await {
        Ok(segments) => segments,
        Err(e) => {
            log::warn!("detect intent failed for chat {}: {}", chat_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    let messages = translate::to_outbound_messages(&segments, chat_id);
    log::debug!(
        "translated {} segments into {} messages for chat {}",
        segments.len(),
        messages.len(),
        chat_id
    );
    for message in &messages {
        // A failed send must not stop the rest of the batch.
        if let Err(e) = state.telegram.send(message).await {
            log::warn!(
                "sending {} to chat {} failed: {}",
                message.endpoint(),
                message.chat_id(),
                e
            );
        }
    }
    StatusCode::OK
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<RelayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "sessions": state.sessions.len().await,
    }))
}
