//! Configuration management
//!
//! Sources, later ones winning: built-in defaults, a TOML file, `SMSPIT_*`
//! environment variables, then command-line flags (applied by the binary).

use anyhow::{bail, Context, Result};
use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// File the configuration was read from, if any
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Interface both listeners bind to
    pub host: String,

    /// Web UI / query API port
    pub web_port: u16,

    /// Capture API port
    pub api_port: u16,

    /// Store capacity; oldest messages are evicted beyond this
    pub max_messages: usize,

    /// Expose the Twilio-compatible capture route
    pub twilio_compat: bool,

    /// Shared secret required on every request when set
    pub auth_token: Option<String>,

    /// Value of `Access-Control-Allow-Origin`
    pub cors_origins: String,

    /// Events a WebSocket subscriber may lag behind before it is dropped
    pub subscriber_queue: usize,

    /// Time in-flight requests get to finish on shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            host: "0.0.0.0".to_string(),
            web_port: 8080,
            api_port: 9080,
            max_messages: 10_000,
            twilio_compat: false,
            auth_token: None,
            cors_origins: "*".to_string(),
            subscriber_queue: 256,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist. Without one, the per-user config file is
    /// read when present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Some(default_path) if default_path.exists() => Self::from_file(&default_path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: ServerConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply `SMSPIT_*` overrides; empty values count as unset
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get("SMSPIT_HOST") {
            self.host = host;
        }
        if let Some(port) = get("SMSPIT_WEB_PORT") {
            self.web_port = parse_env("SMSPIT_WEB_PORT", &port)?;
        }
        if let Some(port) = get("SMSPIT_API_PORT") {
            self.api_port = parse_env("SMSPIT_API_PORT", &port)?;
        }
        if let Some(max) = get("SMSPIT_MAX_MESSAGES") {
            self.max_messages = parse_env("SMSPIT_MAX_MESSAGES", &max)?;
        }
        if let Some(flag) = get("SMSPIT_TWILIO_COMPAT") {
            self.twilio_compat = parse_flag(&flag);
        }
        if let Some(token) = get("SMSPIT_AUTH_TOKEN") {
            self.auth_token = Some(token);
        }
        if let Some(origins) = get("SMSPIT_CORS_ORIGINS") {
            self.cors_origins = origins;
        }
        if let Some(queue) = get("SMSPIT_SUBSCRIBER_QUEUE") {
            self.subscriber_queue = parse_env("SMSPIT_SUBSCRIBER_QUEUE", &queue)?;
        }
        if let Some(grace) = get("SMSPIT_SHUTDOWN_GRACE_SECS") {
            self.shutdown_grace_secs = parse_env("SMSPIT_SHUTDOWN_GRACE_SECS", &grace)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_messages == 0 {
            bail!("max_messages must be at least 1");
        }
        if self.subscriber_queue == 0 {
            bail!("subscriber_queue must be at least 1");
        }
        if HeaderValue::from_str(&self.cors_origins).is_err() {
            bail!("cors_origins is not a valid header value: {:?}", self.cors_origins);
        }
        Ok(())
    }

    /// Configured secret, ignoring an empty string
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn web_bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.web_port)
    }

    pub fn api_bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.api_port)
    }

    /// Get default config path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("smspit").join("config.toml"))
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, value))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "true" | "1" | "yes")
}
