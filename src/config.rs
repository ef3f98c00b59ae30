//! Runtime configuration read from the environment (and `.env`).
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `FIELD_SENTINEL_API_URL` | `http://localhost:5000` | backend base URL |
//! | `FIELD_SENTINEL_HTTP_TIMEOUT_SECS` | unset | overall request timeout |
//! | `FIELD_SENTINEL_LOCATION_TIMEOUT_SECS` | `10` | wait for a GPS fix |
//! | `FIELD_SENTINEL_REQUIRE_SIMPLE_RING` | `false` | reject self-crossing rings |
//! | `LOG_FILE_PATH` | `logs/field_sentinel.log` | JSON log file |

use anyhow::{Context, Result};
use std::time::Duration;

use crate::capture::CaptureOptions;
use crate::location::LOCATION_TIMEOUT;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_LOG_FILE: &str = "logs/field_sentinel.log";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub http_timeout: Option<Duration>,
    pub location_timeout: Duration,
    pub require_simple_ring: bool,
    pub log_file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout: None,
            location_timeout: LOCATION_TIMEOUT,
            require_simple_ring: false,
            log_file_path: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("FIELD_SENTINEL_API_URL") {
            config.api_url = url;
        }
        if let Some(secs) = lookup("FIELD_SENTINEL_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Some(parse_secs("FIELD_SENTINEL_HTTP_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = lookup("FIELD_SENTINEL_LOCATION_TIMEOUT_SECS") {
            config.location_timeout = parse_secs("FIELD_SENTINEL_LOCATION_TIMEOUT_SECS", &secs)?;
        }
        if let Some(flag) = lookup("FIELD_SENTINEL_REQUIRE_SIMPLE_RING") {
            config.require_simple_ring = parse_flag(&flag)
                .with_context(|| format!("FIELD_SENTINEL_REQUIRE_SIMPLE_RING='{flag}'"))?;
        }
        if let Some(path) = lookup("LOG_FILE_PATH") {
            config.log_file_path = path;
        }

        Ok(config)
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            location_timeout: self.location_timeout,
            require_simple_ring: self.require_simple_ring,
        }
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds, got '{value}'"))?;
    Ok(Duration::from_secs(secs))
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(anyhow::anyhow!("expected a boolean")),
    }
}
