//! Configuration for the `PagerDuty` automation tools.
//!
//! All settings come from `PD_*` environment variables; the binaries layer
//! command-line overrides on top.

use chrono::FixedOffset;
use std::env;
use std::time::Duration;

use crate::context::TeamSelection;
use crate::error::{PagerDutyError, Result};
use crate::pagination::PaginationOptions;
use crate::retry::RetryPolicy;
use crate::window::{self, DEFAULT_WINDOW_HOUR};

/// Environment variable holding the REST API token.
pub const ENV_API_KEY: &str = "PD_API_KEY";

/// `PagerDuty` REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.pagerduty.com";

/// Public status document endpoint.
pub const DEFAULT_STATUS_URL: &str = "https://status.pagerduty.com/api/v2/status.json";

/// Incident tool configuration.
#[derive(Clone)]
pub struct Config {
    /// REST API token.
    pub api_key: String,
    /// REST API base URL.
    pub api_url: String,
    /// Offset the query window is anchored to.
    pub window_offset: FixedOffset,
    /// Hour of day the window opens and closes.
    pub window_hour: u32,
    /// Rule used to pick the working team.
    pub team_selection: TeamSelection,
    /// Page size and page bound for list endpoints.
    pub pagination: PaginationOptions,
    /// Retry policy for reads.
    pub retry: RetryPolicy,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("window_offset", &self.window_offset)
            .field("window_hour", &self.window_hour)
            .field("team_selection", &self.team_selection)
            .field("pagination", &self.pagination)
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Config {
    /// Configuration with defaults for everything but the token.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            window_offset: window::default_offset(),
            window_hour: DEFAULT_WINDOW_HOUR,
            team_selection: TeamSelection::default(),
            pagination: PaginationOptions::default(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns a configuration error if `PD_API_KEY` is missing or any
    /// override fails to parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get(ENV_API_KEY)
            .ok_or_else(|| PagerDutyError::Config("Export your PD_API_KEY".to_string()))?;

        let mut config = Self::new(api_key.trim());

        if let Some(url) = get("PD_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(offset) = get("PD_UTC_OFFSET") {
            config.window_offset = window::parse_offset(&offset)?;
        }
        if let Some(hour) = get("PD_WINDOW_HOUR") {
            config.window_hour = parse_number("PD_WINDOW_HOUR", &hour)?;
        }
        if let Some(rule) = get("PD_TEAM") {
            config.team_selection = rule.parse()?;
        }
        if let Some(pages) = get("PD_MAX_PAGES") {
            let max_pages: u32 = parse_number("PD_MAX_PAGES", &pages)?;
            if max_pages == 0 {
                return Err(PagerDutyError::Config(
                    "PD_MAX_PAGES must be at least 1".to_string(),
                ));
            }
            config.pagination.max_pages = max_pages;
        }
        if let Some(attempts) = get("PD_RETRY_ATTEMPTS") {
            config.retry =
                RetryPolicy::new(parse_number("PD_RETRY_ATTEMPTS", &attempts)?, config.retry.base_delay);
        }
        if let Some(delay) = get("PD_RETRY_BASE_DELAY_MS") {
            config.retry.base_delay =
                Duration::from_millis(parse_number("PD_RETRY_BASE_DELAY_MS", &delay)?);
        }
        if let Some(secs) = get("PD_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_number("PD_TIMEOUT_SECS", &secs)?);
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| PagerDutyError::Config(format!("{key} must be a number, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("PD_API_KEY"));

        let err = Config::from_lookup(lookup(&[("PD_API_KEY", "  ")])).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("PD_API_KEY", "secret")])).unwrap();

        assert_eq!(config.api_key, "secret");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.window_offset.local_minus_utc(), 12 * 3600);
        assert_eq!(config.window_hour, 8);
        assert_eq!(config.team_selection, TeamSelection::First);
        assert_eq!(config.pagination.page_size, 100);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PD_API_KEY", "secret"),
            ("PD_API_URL", "http://localhost:9999/"),
            ("PD_UTC_OFFSET", "-05:00"),
            ("PD_WINDOW_HOUR", "6"),
            ("PD_TEAM", "id:PTEAM9"),
            ("PD_MAX_PAGES", "5"),
            ("PD_RETRY_ATTEMPTS", "4"),
            ("PD_RETRY_BASE_DELAY_MS", "10"),
            ("PD_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://localhost:9999");
        assert_eq!(config.window_offset.local_minus_utc(), -5 * 3600);
        assert_eq!(config.window_hour, 6);
        assert_eq!(config.team_selection, TeamSelection::Id("PTEAM9".into()));
        assert_eq!(config.pagination.max_pages, 5);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay, Duration::from_millis(10));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("PD_API_KEY", "secret"),
            ("PD_MAX_PAGES", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PD_MAX_PAGES"));
    }

    #[test]
    fn test_zero_page_bound_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("PD_API_KEY", "secret"),
            ("PD_MAX_PAGES", "0"),
        ]))
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var(ENV_API_KEY, "from-env");
        std::env::set_var("PD_TEAM", "last");
        let config = Config::from_env();
        std::env::remove_var(ENV_API_KEY);
        std::env::remove_var("PD_TEAM");

        let config = config.unwrap();
        assert_eq!(config.api_key, "from-env");
        assert_eq!(config.team_selection, TeamSelection::Last);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config::new("very-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("very-secret"));
    }
}
