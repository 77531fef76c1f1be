use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::kernel::history::DEFAULT_HISTORY_LIMIT;
use crate::kernel::turn::TurnTiming;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL serving `/api/chat` and `/api/get-access-token`.
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub timing: TurnTiming,
    pub history_limit: usize,
    /// Origin prefixes accepted on inbound host messages.
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            http_timeout: Duration::from_secs(10),
            timing: TurnTiming::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            allowed_origins: vec!["http://localhost".to_string(), "https://localhost".to_string()],
        }
    }
}

impl AppConfig {
    /// Load from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("AVATAR_API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_base_url);

        let http_timeout = parse::<u64>(&lookup, "AVATAR_HTTP_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.http_timeout);

        let timing = TurnTiming {
            speech_settle: parse::<u64>(&lookup, "AVATAR_SPEECH_SETTLE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.timing.speech_settle),
            resume_guard: parse::<u64>(&lookup, "AVATAR_RESUME_GUARD_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.timing.resume_guard),
        };

        let history_limit = match parse::<usize>(&lookup, "AVATAR_HISTORY_LIMIT")? {
            Some(limit) if limit < 2 => {
                return Err(ConfigError::Invalid {
                    key: "AVATAR_HISTORY_LIMIT",
                    value: limit.to_string(),
                })
            }
            Some(limit) => limit,
            None => defaults.history_limit,
        };

        let allowed_origins = lookup("AVATAR_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or(defaults.allowed_origins);

        Ok(Self {
            api_base_url,
            http_timeout,
            timing,
            history_limit,
            allowed_origins,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(ConfigError::Invalid { key, value: raw }),
        },
    }
}
