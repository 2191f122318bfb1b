use std::path::PathBuf;

use chess::Color;

use crate::errors::ConfigError;
use crate::game::utils::color_from_str;

/// Server configuration, read from `CHESS_*` environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: String,
    pub ai_enabled: bool,
    pub ai_color: Color,
    /// Fixed seed for a reproducible automated opponent
    pub ai_seed: Option<u64>,
    /// Enables position injection and keeps injected sessions across page loads
    pub testing: bool,
    /// Persist sessions as files here instead of in memory
    pub session_dir: Option<PathBuf>,
    pub cookie_name: String,
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "127.0.0.1:8080".to_string(),
            ai_enabled: true,
            ai_color: Color::Black,
            ai_seed: None,
            testing: false,
            session_dir: None,
            cookie_name: "chess_session".to_string(),
            static_dir: PathBuf::from("./static"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(bind) = lookup("CHESS_BIND") {
            config.bind = bind;
        }
        if let Some(value) = lookup("CHESS_AI_ENABLED") {
            config.ai_enabled = parse_bool("CHESS_AI_ENABLED", &value)?;
        }
        if let Some(value) = lookup("CHESS_AI_COLOR") {
            config.ai_color = color_from_str(&value).ok_or(ConfigError::InvalidValue {
                key: "CHESS_AI_COLOR",
                value,
            })?;
        }
        if let Some(value) = lookup("CHESS_AI_SEED") {
            config.ai_seed = Some(value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "CHESS_AI_SEED",
                value: value.clone(),
            })?);
        }
        if let Some(value) = lookup("CHESS_TESTING") {
            config.testing = parse_bool("CHESS_TESTING", &value)?;
        }
        if let Some(dir) = lookup("CHESS_SESSION_DIR").filter(|d| !d.is_empty()) {
            config.session_dir = Some(PathBuf::from(dir));
        }
        if let Some(name) = lookup("CHESS_COOKIE_NAME").filter(|n| !n.is_empty()) {
            config.cookie_name = name;
        }
        if let Some(dir) = lookup("CHESS_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        Ok(config)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
