//! Mapper configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use reqwest::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/rhodonea-mapper/api/";
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Largest page the layers service will return.
pub const MAX_PAGE_LIMIT: u32 = 50;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid RHODONEA_API_BASE_URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidBaseUrl { .. } => "E_CONFIG_BASE_URL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect_secs: u64,
    /// Whole-request timeout; `None` waits for the transport to give up.
    pub request_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperConfig {
    /// Always ends with `/` so relative endpoint paths join under it.
    pub api_base_url: String,
    pub page_limit: u32,
    pub timeouts: Timeouts,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            page_limit: DEFAULT_PAGE_LIMIT,
            timeouts: Timeouts { connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS, request_secs: None },
        }
    }
}

impl MapperConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `RHODONEA_API_BASE_URL`: default `http://127.0.0.1:8000/rhodonea-mapper/api/`
    /// - `RHODONEA_PAGE_LIMIT`: default 10, clamped to `1..=50`
    /// - `RHODONEA_CONNECT_TIMEOUT_SECS`: default 10
    /// - `RHODONEA_REQUEST_TIMEOUT_SECS`: unset means no request timeout
    ///
    /// # Errors
    ///
    /// Returns `InvalidBaseUrl` if the base URL does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MapperConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBaseUrl` if the base URL does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = normalize_base_url(
            lookup("RHODONEA_API_BASE_URL")
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE_URL),
        )?;
        let page_limit = parse_or(lookup("RHODONEA_PAGE_LIMIT"), DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let timeouts = Timeouts {
            connect_secs: parse_or(lookup("RHODONEA_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
            request_secs: lookup("RHODONEA_REQUEST_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()),
        };
        Ok(Self { api_base_url, page_limit, timeouts })
    }
}

/// Parse a base URL and make sure it ends with a slash.
///
/// # Errors
///
/// Returns `InvalidBaseUrl` if `raw` is not an absolute URL.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') { trimmed.to_owned() } else { format!("{trimmed}/") };
    Url::parse(&with_slash)
        .map(String::from)
        .map_err(|e| ConfigError::InvalidBaseUrl { url: raw.to_owned(), reason: e.to_string() })
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
