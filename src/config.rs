//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
pub const DEFAULT_SHARE_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Errors produced while building a [`ClientConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got '{value}'")]
    InvalidUrl { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Remote Data Gateway base URL, without trailing slash.
    pub api_base_url: String,
    /// Identity provider API key. Sign-in flows fail without it.
    pub identity_api_key: Option<String>,
    pub identity_url: String,
    pub token_url: String,
    /// Origin public share links are built against.
    pub share_origin: String,
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            identity_api_key: None,
            identity_url: DEFAULT_IDENTITY_URL.to_owned(),
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            share_origin: DEFAULT_SHARE_ORIGIN.to_owned(),
            timeouts: Timeouts::default(),
        }
    }
}

impl ClientConfig {
    /// Build typed config from the process environment.
    ///
    /// Optional:
    /// - `CINEFAV_API_BASE_URL`: default `http://localhost:3001/api`
    /// - `CINEFAV_IDENTITY_API_KEY`: no default
    /// - `CINEFAV_IDENTITY_URL`, `CINEFAV_TOKEN_URL`: provider REST endpoints
    /// - `CINEFAV_SHARE_ORIGIN`: default `http://localhost:3000`
    /// - `CINEFAV_REQUEST_TIMEOUT_SECS`: default 30
    /// - `CINEFAV_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a URL variable is not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL variable is not an http(s) URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = |var: &'static str, default: &str| -> Result<String, ConfigError> {
            let raw = lookup(var).filter(|v| !v.trim().is_empty());
            normalize_url(var, raw.as_deref().unwrap_or(default))
        };
        let parse_u64 = |var: &str, default: u64| -> u64 {
            lookup(var)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            api_base_url: url("CINEFAV_API_BASE_URL", DEFAULT_API_BASE_URL)?,
            identity_api_key: lookup("CINEFAV_IDENTITY_API_KEY")
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty()),
            identity_url: url("CINEFAV_IDENTITY_URL", DEFAULT_IDENTITY_URL)?,
            token_url: url("CINEFAV_TOKEN_URL", DEFAULT_TOKEN_URL)?,
            share_origin: url("CINEFAV_SHARE_ORIGIN", DEFAULT_SHARE_ORIGIN)?,
            timeouts: Timeouts {
                request_secs: parse_u64("CINEFAV_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_u64("CINEFAV_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
        })
    }
}

fn normalize_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_owned())
    } else {
        Err(ConfigError::InvalidUrl { var, value: raw.to_owned() })
    }
}
