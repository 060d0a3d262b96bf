//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.dfrelay/config.json`) and environment.
//! Every credential-like field can be overridden by an environment variable so the
//! relay can run with no config file at all.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Dialogflow CX agent settings.
    #[serde(default)]
    pub dialogflow: DialogflowConfig,

    /// Session-affinity settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Gateway bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port the webhook HTTP server listens on (default 8080).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// Public base URL Telegram POSTs webhook updates to (e.g. "https://bot.example.com").
    /// The webhook path `/webhook/{token}` is appended. Overridden by DFRELAY_SERVER_URL env.
    pub server_url: Option<String>,
}

/// Dialogflow CX agent config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogflowConfig {
    /// GCP project id. Overridden by DFRELAY_PROJECT_ID env.
    #[serde(default)]
    pub project_id: String,
    /// Agent location (e.g. "us-central1"); also selects the regional API endpoint.
    /// Overridden by DFRELAY_LOCATION env.
    #[serde(default = "default_location")]
    pub location: String,
    /// Agent id. Overridden by DFRELAY_AGENT_ID env.
    #[serde(default)]
    pub agent_id: String,
    /// Language tag sent with every detect-intent query. Overridden by DFRELAY_LANGUAGE env.
    #[serde(default = "default_language_code")]
    pub language_code: String,
    /// OAuth2 bearer token for the Dialogflow REST API. Overridden by DFRELAY_ACCESS_TOKEN env.
    pub access_token: Option<String>,
}

fn default_location() -> String {
    "global".to_string()
}

fn default_language_code() -> String {
    "en".to_string()
}

impl Default for DialogflowConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            location: default_location(),
            agent_id: String::new(),
            language_code: default_language_code(),
            access_token: None,
        }
    }
}

impl DialogflowConfig {
    /// Fully-qualified session resource name for the CX API.
    pub fn session_path(&self, session_id: &str) -> String {
        format!(
            "projects/{}/locations/{}/agents/{}/sessions/{}",
            self.project_id, self.location, self.agent_id, session_id
        )
    }
}

/// Session-affinity cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// How long a chat keeps its Dialogflow session with no activity (default 60 minutes).
    #[serde(default = "default_session_ttl_minutes")]
    pub ttl_minutes: u64,
}

fn default_session_ttl_minutes() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_session_ttl_minutes(),
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_bot_token(config: &Config) -> Option<String> {
    env_nonempty("TELEGRAM_BOT_TOKEN").or_else(|| {
        config
            .telegram
            .bot_token
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the public server URL: env DFRELAY_SERVER_URL overrides config.
/// A trailing slash is stripped so the webhook path can be appended directly.
pub fn resolve_server_url(config: &Config) -> Option<String> {
    env_nonempty("DFRELAY_SERVER_URL")
        .or_else(|| config.telegram.server_url.clone())
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
}

/// Apply DFRELAY_* environment overrides to the Dialogflow section.
pub fn apply_dialogflow_env(config: &mut Config) {
    if let Some(v) = env_nonempty("DFRELAY_PROJECT_ID") {
        config.dialogflow.project_id = v;
    }
    if let Some(v) = env_nonempty("DFRELAY_LOCATION") {
        config.dialogflow.location = v;
    }
    if let Some(v) = env_nonempty("DFRELAY_AGENT_ID") {
        config.dialogflow.agent_id = v;
    }
    if let Some(v) = env_nonempty("DFRELAY_LANGUAGE") {
        config.dialogflow.language_code = v;
    }
    if let Some(v) = env_nonempty("DFRELAY_ACCESS_TOKEN") {
        config.dialogflow.access_token = Some(v);
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("DFRELAY_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".dfrelay").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or DFRELAY_CONFIG_PATH). Missing file => default config.
/// Environment overrides for the Dialogflow section are applied after loading.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    apply_dialogflow_env(&mut config);
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 8080);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn default_session_ttl_is_an_hour() {
        assert_eq!(SessionConfig::default().ttl_minutes, 60);
    }

    #[test]
    fn session_path_composes_resource_name() {
        let df = DialogflowConfig {
            project_id: "proj".to_string(),
            location: "us-central1".to_string(),
            agent_id: "agent".to_string(),
            ..Default::default()
        };
        assert_eq!(
            df.session_path("telegram-42-1700000000000"),
            "projects/proj/locations/us-central1/agents/agent/sessions/telegram-42-1700000000000"
        );
    }

    #[test]
    fn empty_config_json_parses_to_defaults() {
        let config: Config = serde_json::from_str("{}").expect("parse empty config");
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.dialogflow.language_code, "en");
        assert_eq!(config.dialogflow.location, "global");
        assert!(config.telegram.bot_token.is_none());
    }
}
