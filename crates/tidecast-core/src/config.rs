//! Client configuration resolved from the environment and CLI overrides.

use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_API_BASE: &str = "TIDECAST_API_BASE";
pub const ENV_TIMEOUT_MS: &str = "TIDECAST_TIMEOUT_MS";
pub const ENV_CACHE_TTL_SECS: &str = "TIDECAST_CACHE_TTL_SECS";

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = crate::http_client::DEFAULT_TIMEOUT_MS;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base: String,
    pub timeout_ms: u64,
    pub cache_ttl: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: String::from(DEFAULT_API_BASE),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            user_agent: format!("tidecast/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Reads the `TIDECAST_*` variables over the defaults and validates.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(api_base) = present(ENV_API_BASE) {
            config.api_base = api_base;
        }
        if let Some(raw) = present(ENV_TIMEOUT_MS) {
            config.timeout_ms = parse_u64(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = present(ENV_CACHE_TTL_SECS) {
            config.cache_ttl = Duration::from_secs(parse_u64(ENV_CACHE_TTL_SECS, &raw)?);
        }

        config.validate()
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Checks the base URL scheme and timeout, trimming trailing slashes.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let trimmed = self.api_base.trim().trim_end_matches('/');
        let has_scheme = ["http://", "https://"].iter().any(|scheme| {
            trimmed.len() > scheme.len()
                && trimmed
                    .get(..scheme.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        });
        if !has_scheme {
            return Err(ConfigError::InvalidApiBase {
                value: self.api_base,
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        self.api_base = trimmed.to_owned();
        Ok(self)
    }

    /// `api_base` joined with an absolute path such as `/meta`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}

fn parse_u64(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: raw.to_owned(),
        })
}
