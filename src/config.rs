use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::monitor::scheduler::{DEFAULT_INTERVAL_SECS, MIN_INTERVAL_SECS};

#[derive(Deserialize, Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,

    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,

    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u64,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialBotConfig {
    telegram_token: Option<String>,
    telegram_api_url: Option<String>,
    database_url: Option<String>,
    log_dir: Option<String>,
    check_interval_seconds: Option<u64>,
    probe_timeout_seconds: Option<u64>,
    poll_timeout_seconds: Option<u64>,
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_database_url() -> String {
    "sqlite://bot_database.sqlite?mode=rwc".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_check_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_poll_timeout() -> u64 {
    30
}

impl BotConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialBotConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialBotConfig::default()
            }
        } else {
            PartialBotConfig::default()
        };

        // 2. Load from environment variables
        let env_config: PartialBotConfig = envy::from_env::<PartialBotConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        merge(env_config, file_config)
    }
}

fn merge(env_config: PartialBotConfig, file_config: PartialBotConfig) -> Result<BotConfig, String> {
    let config = BotConfig {
        telegram_token: env_config
            .telegram_token
            .or(file_config.telegram_token)
            .filter(|t| !t.is_empty())
            .ok_or("TELEGRAM_TOKEN is required")?,
        telegram_api_url: env_config
            .telegram_api_url
            .or(file_config.telegram_api_url)
            .unwrap_or_else(default_telegram_api_url),
        database_url: env_config
            .database_url
            .or(file_config.database_url)
            .unwrap_or_else(default_database_url),
        log_dir: env_config
            .log_dir
            .or(file_config.log_dir)
            .unwrap_or_else(default_log_dir),
        check_interval_seconds: env_config
            .check_interval_seconds
            .or(file_config.check_interval_seconds)
            .unwrap_or_else(default_check_interval),
        probe_timeout_seconds: env_config
            .probe_timeout_seconds
            .or(file_config.probe_timeout_seconds)
            .unwrap_or_else(default_probe_timeout),
        poll_timeout_seconds: env_config
            .poll_timeout_seconds
            .or(file_config.poll_timeout_seconds)
            .unwrap_or_else(default_poll_timeout),
    };

    if config.check_interval_seconds < MIN_INTERVAL_SECS {
        return Err(format!(
            "CHECK_INTERVAL_SECONDS must be at least {MIN_INTERVAL_SECS}, got {}",
            config.check_interval_seconds
        ));
    }
    if config.probe_timeout_seconds == 0 {
        return Err("PROBE_TIMEOUT_SECONDS must be greater than zero".to_string());
    }

    Ok(config)
}
