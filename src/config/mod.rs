//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: String,

    /// Simulation ticks per second (one tick per rendered frame)
    pub frame_rate: u32,
    /// Send a snapshot every N ticks
    pub snapshot_every: u32,
    /// Minimum ticks between two dialogue requests triggered by hits
    pub hit_dialogue_interval: u64,

    /// Gemini API key; dialogue falls back to canned lines without one
    pub gemini_api_key: Option<String>,
    /// Base URL of the text-generation API
    pub dialogue_api_url: String,
    /// Model used for dialogue and bios
    pub dialogue_model: String,
    /// Per-request timeout for dialogue calls
    pub dialogue_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let frame_rate: u32 = parse_or(&lookup, "FRAME_RATE", 60)?;
        if frame_rate == 0 {
            return Err(ConfigError::Invalid("FRAME_RATE"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: lookup("CLIENT_ORIGIN")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),

            frame_rate,
            snapshot_every: parse_or::<u32, _>(&lookup, "SNAPSHOT_EVERY", 1)?.max(1),
            hit_dialogue_interval: parse_or(&lookup, "HIT_DIALOGUE_INTERVAL", 180)?,

            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()),
            dialogue_api_url: lookup("DIALOGUE_API_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            dialogue_model: lookup("DIALOGUE_MODEL")
                .unwrap_or_else(|| "gemini-3-flash-preview".to_string()),
            dialogue_timeout: Duration::from_millis(parse_or(
                &lookup,
                "DIALOGUE_TIMEOUT_MS",
                8000,
            )?),
        })
    }
}

/// Parse an optional variable, using `default` when it is unset
fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
