//! Client configuration.
//!
//! All knobs are plain values with the defaults the hosted API tolerates
//! comfortably; [`ClientConfig::from_env`] layers environment overrides on
//! top. There is no config file format of its own.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key, sent as a bearer token.
    pub api_key: String,
    /// Tailnet name the client operates on.
    pub tailnet: String,
    /// Control-plane base URL.
    pub base_url: String,
    /// Per-attempt request timeout, owned by the transport.
    pub request_timeout: Duration,
    /// Allowed requests per second.
    pub rate: f64,
    /// Trailing window, in seconds, over which the quota is tracked.
    pub window: u64,
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Exponential backoff multiplier. Must be > 1.0.
    pub backoff_factor: f64,
    /// Add random jitter to retry delays.
    pub jitter: bool,
    /// Upper bound on concurrent in-flight requests.
    pub max_connections: usize,
    /// Idle connections kept alive per host.
    pub max_keepalive_connections: usize,
}

/// Errors raised while assembling or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("an API key is required; set TAILSCALE_API_KEY or populate api_key")]
    MissingApiKey,
    #[error("a tailnet name is required; set TAILSCALE_TAILNET or populate tailnet")]
    MissingTailnet,
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },
    #[error("invalid retry policy: {0}")]
    Retry(#[from] crate::retry::BuildError),
    #[error("failed to build HTTP transport: {0}")]
    Transport(String),
}

impl ClientConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.tailscale.com";

    /// Configuration with defaults for everything but the credentials.
    pub fn new(api_key: impl Into<String>, tailnet: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            tailnet: tailnet.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            rate: 1.0,
            window: 60,
            max_retries: 3,
            backoff_factor: 2.0,
            jitter: true,
            max_connections: 10,
            max_keepalive_connections: 5,
        }
    }

    /// Load configuration from the environment.
    ///
    /// `TAILSCALE_API_KEY` and `TAILSCALE_TAILNET` are required; the tunables
    /// (`TAILSCALE_API_BASE_URL`, `API_TIMEOUT`, `RATE_LIMIT_PER_SECOND`,
    /// `RATE_LIMIT_WINDOW`, `MAX_RETRIES`, `RETRY_BACKOFF_FACTOR`,
    /// `MAX_CONNECTIONS`, `MAX_KEEPALIVE_CONNECTIONS`) fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = non_empty_var("TAILSCALE_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let tailnet = non_empty_var("TAILSCALE_TAILNET").ok_or(ConfigError::MissingTailnet)?;

        let mut config = Self::new(api_key, tailnet);
        if let Some(base_url) = non_empty_var("TAILSCALE_API_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(timeout) = parse_var::<f64>("API_TIMEOUT")? {
            config.request_timeout = Duration::try_from_secs_f64(timeout)
                .map_err(|_| ConfigError::InvalidValue {
                    name: "API_TIMEOUT",
                    value: timeout.to_string(),
                })?;
        }
        if let Some(rate) = parse_var("RATE_LIMIT_PER_SECOND")? {
            config.rate = rate;
        }
        if let Some(window) = parse_var("RATE_LIMIT_WINDOW")? {
            config.window = window;
        }
        if let Some(retries) = parse_var("MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(factor) = parse_var("RETRY_BACKOFF_FACTOR")? {
            config.backoff_factor = factor;
        }
        if let Some(max) = parse_var("MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(max) = parse_var("MAX_KEEPALIVE_CONNECTIONS")? {
            config.max_keepalive_connections = max;
        }
        Ok(config)
    }

    /// Reject configurations the client cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.tailnet.is_empty() {
            return Err(ConfigError::MissingTailnet);
        }
        if !(self.rate > 0.0) || !self.rate.is_finite() {
            return Err(self.invalid("rate", self.rate.to_string()));
        }
        if self.window == 0 {
            return Err(self.invalid("window", "0".to_string()));
        }
        if !(self.backoff_factor > 1.0) || !self.backoff_factor.is_finite() {
            return Err(self.invalid("backoff_factor", self.backoff_factor.to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(self.invalid("request_timeout", "0".to_string()));
        }
        if self.max_connections == 0 {
            return Err(self.invalid("max_connections", "0".to_string()));
        }
        Ok(())
    }

    fn invalid(&self, name: &'static str, value: String) -> ConfigError {
        ConfigError::InvalidValue { name, value }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match non_empty_var(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = ClientConfig::new("tskey-api-test", "example.com");
        assert_eq!(config.base_url, ClientConfig::DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.rate, 1.0);
        assert_eq!(config.window, 60);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_factor, 2.0);
        assert!(config.jitter);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.max_keepalive_connections, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_credentials() {
        let config = ClientConfig::new("", "example.com");
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));

        let config = ClientConfig::new("tskey-api-test", "");
        assert!(matches!(config.validate(), Err(ConfigError::MissingTailnet)));
    }

    #[test]
    fn validate_rejects_unusable_knobs() {
        let mut config = ClientConfig::new("tskey-api-test", "example.com");
        config.rate = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name: "rate", .. })
        ));

        let mut config = ClientConfig::new("tskey-api-test", "example.com");
        config.window = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::new("tskey-api-test", "example.com");
        config.backoff_factor = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name: "backoff_factor", .. })
        ));

        let mut config = ClientConfig::new("tskey-api-test", "example.com");
        config.max_connections = 0;
        assert!(config.validate().is_err());
    }

    // Environment mutation is process-global, so every from_env path runs in
    // one test to avoid interleaving with parallel tests.
    #[test]
    fn from_env_reads_required_and_optional_values() {
        let vars = [
            "TAILSCALE_API_KEY",
            "TAILSCALE_TAILNET",
            "TAILSCALE_API_BASE_URL",
            "API_TIMEOUT",
            "RATE_LIMIT_PER_SECOND",
            "RATE_LIMIT_WINDOW",
            "MAX_RETRIES",
            "RETRY_BACKOFF_FACTOR",
            "MAX_CONNECTIONS",
            "MAX_KEEPALIVE_CONNECTIONS",
        ];
        for name in vars {
            env::remove_var(name);
        }

        assert!(matches!(ClientConfig::from_env(), Err(ConfigError::MissingApiKey)));

        env::set_var("TAILSCALE_API_KEY", "tskey-api-test");
        assert!(matches!(ClientConfig::from_env(), Err(ConfigError::MissingTailnet)));

        env::set_var("TAILSCALE_TAILNET", "example.com");
        let config = ClientConfig::from_env().expect("config");
        assert_eq!(config.api_key, "tskey-api-test");
        assert_eq!(config.tailnet, "example.com");
        assert_eq!(config.rate, 1.0);

        env::set_var("RATE_LIMIT_PER_SECOND", "2.5");
        env::set_var("RATE_LIMIT_WINDOW", "30");
        env::set_var("MAX_RETRIES", "5");
        env::set_var("API_TIMEOUT", "10.5");
        let config = ClientConfig::from_env().expect("config");
        assert_eq!(config.rate, 2.5);
        assert_eq!(config.window, 30);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.request_timeout, Duration::from_secs_f64(10.5));

        env::set_var("MAX_RETRIES", "not-a-number");
        assert!(matches!(
            ClientConfig::from_env(),
            Err(ConfigError::InvalidValue { name: "MAX_RETRIES", .. })
        ));

        for name in vars {
            env::remove_var(name);
        }
    }
}
