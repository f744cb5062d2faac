// crates/server/src/config.rs
//! Process configuration read from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `BOT_TOKEN` | required |
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `10000` |
//! | `TELEGRAM_API_URL` | `https://api.telegram.org` |
//! | `WEBHOOK_URL` | unset (webhook not registered) |
//! | `SHEETBOT_PROGRESS_STEPS` | `10` |
//! | `SHEETBOT_MAX_PAGES` | `12000` |
//! | `SHEETBOT_JOB_TIMEOUT_SECS` | `600`, `0` disables |
//! | `SHEETBOT_WORK_DIR` | system temp dir |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sheetbot_jobs::JobConfig;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} env var is not set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub host: IpAddr,
    pub port: u16,
    /// Telegram Bot API base URL, without trailing slash.
    pub api_base: String,
    /// Public base URL; the webhook is registered at `{webhook_url}/webhook/{token}`.
    pub webhook_url: Option<String>,
    pub jobs: JobConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let host = parse_or(get("HOST"), "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let api_base = get("TELEGRAM_API_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let webhook_url = get("WEBHOOK_URL").map(|url| url.trim_end_matches('/').to_string());

        let defaults = JobConfig::default();
        let progress_steps = parse_or(get("SHEETBOT_PROGRESS_STEPS"), "SHEETBOT_PROGRESS_STEPS", defaults.progress_steps)?;
        if progress_steps == 0 {
            return Err(invalid("SHEETBOT_PROGRESS_STEPS", "0", "must be at least 1"));
        }
        let max_units = parse_or(get("SHEETBOT_MAX_PAGES"), "SHEETBOT_MAX_PAGES", defaults.max_units)?;
        if max_units == 0 {
            return Err(invalid("SHEETBOT_MAX_PAGES", "0", "must be at least 1"));
        }
        let job_timeout = match get("SHEETBOT_JOB_TIMEOUT_SECS") {
            None => defaults.job_timeout,
            Some(raw) => match parse::<u64>(&raw, "SHEETBOT_JOB_TIMEOUT_SECS")? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        };
        let work_dir = get("SHEETBOT_WORK_DIR").map(PathBuf::from).unwrap_or(defaults.work_dir);

        Ok(Self {
            bot_token,
            host,
            port,
            api_base,
            webhook_url,
            jobs: JobConfig {
                progress_steps,
                max_units,
                job_timeout,
                work_dir,
            },
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Full URL Telegram should deliver updates to, if one is configured.
    pub fn webhook_endpoint(&self) -> Option<String> {
        self.webhook_url
            .as_ref()
            .map(|base| format!("{base}/webhook/{}", self.bot_token))
    }
}

fn parse<T>(raw: &str, var: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| invalid(var, raw, &e.to_string()))
}

fn parse_or<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse(&raw, var),
        None => Ok(default),
    }
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
