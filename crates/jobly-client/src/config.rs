//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ClientError, ClientResult};

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://arnabsahawrk-jobly-backend.vercel.app/api";

/// Authorization scheme expected by the backend's JWT authentication.
pub const DEFAULT_AUTH_SCHEME: &str = "JWT";

/// Jobly client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Transport-level request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Scheme placed before the access token in the Authorization header
    pub auth_scheme: String,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            user_agent: concat!("jobly-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let defaults = Self::default();

        let base_url = std::env::var("JOBLY_API_BASE_URL").unwrap_or(defaults.base_url);

        let timeout_secs: u64 = std::env::var("JOBLY_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let connect_timeout_secs: u64 = std::env::var("JOBLY_API_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let auth_scheme = std::env::var("JOBLY_AUTH_SCHEME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.auth_scheme);

        Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            auth_scheme,
            user_agent: defaults.user_agent,
        }
        .validated()
    }

    /// Config pointing at a different API, e.g. a local backend or a mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> ClientResult<Self> {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
        .validated()
    }

    /// Normalize the base URL and reject unusable values.
    pub fn validated(mut self) -> ClientResult<Self> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ClientError::config("API base URL cannot be empty"));
        }

        let parsed = Url::parse(trimmed)
            .map_err(|e| ClientError::config(format!("Invalid API base URL {trimmed}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::config(format!(
                "API base URL must use http or https, got {}",
                parsed.scheme()
            )));
        }

        self.base_url = trimmed.to_string();
        Ok(self)
    }

    /// Absolute URL for an API path. Absolute URLs (e.g. pagination links)
    /// are passed through untouched.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "JOBLY_API_BASE_URL",
            "JOBLY_API_TIMEOUT_SECS",
            "JOBLY_API_CONNECT_TIMEOUT_SECS",
            "JOBLY_AUTH_SCHEME",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.auth_scheme, "JWT");
    }

    #[test]
    fn test_trailing_slashes_trimmed() {
        let config = ClientConfig::with_base_url("http://localhost:8000/api///").unwrap();
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert_eq!(config.url_for("/jobs/"), "http://localhost:8000/api/jobs/");
        assert_eq!(config.url_for("jobs/1/"), "http://localhost:8000/api/jobs/1/");
    }

    #[test]
    fn test_absolute_urls_pass_through() {
        let config = ClientConfig::default();
        let next = "https://other.example/api/jobs/?page=2";
        assert_eq!(config.url_for(next), next);
    }

    #[test]
    fn test_rejects_bad_base_urls() {
        assert!(ClientConfig::with_base_url("").is_err());
        assert!(ClientConfig::with_base_url("not a url").is_err());
        assert!(ClientConfig::with_base_url("ftp://example.com").is_err());
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides() {
        clear_env();
        std::env::set_var("JOBLY_API_BASE_URL", "http://127.0.0.1:9000/api/");
        std::env::set_var("JOBLY_API_TIMEOUT_SECS", "12");
        std::env::set_var("JOBLY_AUTH_SCHEME", "Bearer");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000/api");
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.auth_scheme, "Bearer");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_handles_invalid_env_values() {
        clear_env();
        std::env::set_var("JOBLY_API_CONNECT_TIMEOUT_SECS", "not-a-number");
        std::env::set_var("JOBLY_AUTH_SCHEME", "   ");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.auth_scheme, DEFAULT_AUTH_SCHEME);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_from_env_rejects_empty_base_url() {
        clear_env();
        std::env::set_var("JOBLY_API_BASE_URL", "");
        assert!(ClientConfig::from_env().is_err());
        clear_env();
    }
}
