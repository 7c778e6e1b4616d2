//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Default play-field size, used until the peer reports its viewport
pub const DEFAULT_FIELD_WIDTH: f32 = 1280.0;
pub const DEFAULT_FIELD_HEIGHT: f32 = 720.0;
/// Compounds ball x-speed by `1 + difficulty/10000` per tick
pub const DEFAULT_DIFFICULTY: f32 = 1.0;
/// First player to reach this score ends the match
pub const DEFAULT_MAX_SCORE: u32 = 5;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Initial play-field width
    pub field_width: f32,
    /// Initial play-field height
    pub field_height: f32,
    /// Difficulty multiplier applied to ball speed growth
    pub difficulty: f32,
    /// Score at which a match is over
    pub max_score: u32,
    /// Allowed client origin for CORS
    pub client_origin: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting providers hand out PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            field_width: parse_env("FIELD_WIDTH", DEFAULT_FIELD_WIDTH)?,
            field_height: parse_env("FIELD_HEIGHT", DEFAULT_FIELD_HEIGHT)?,
            difficulty: parse_env("DIFFICULTY", DEFAULT_DIFFICULTY)?,
            max_score: parse_env("MAX_SCORE", DEFAULT_MAX_SCORE)?,

            client_origin: env::var("CLIENT_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
        })
    }
}

/// Parse an optional environment variable, keeping the default when unset
fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
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
