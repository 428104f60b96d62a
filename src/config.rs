//! API configuration from the environment

use crate::error::{RelightError, Result};

/// Default API host
pub const DEFAULT_HOST: &str = "https://api.stability.ai";

/// Environment variable holding the bearer token
pub const API_KEY_VAR: &str = "STABILITY_API_KEY";

/// Legacy variable name still honored as a fallback
pub const API_KEY_FALLBACK_VAR: &str = "STABLE_DIFFUSION_API_KEY";

/// Optional host override (used by tests and staging)
pub const API_HOST_VAR: &str = "STABILITY_API_HOST";

/// Connection settings for the Stability API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bearer token presented on every request
    pub api_key: String,

    /// API host, e.g. "https://api.stability.ai"
    pub host: String,
}

impl ApiConfig {
    /// Build a config with an explicit key and the default host
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            host: DEFAULT_HOST.to_string(),
        }
    }

    /// Read configuration from the environment.
    ///
    /// `STABILITY_API_KEY` is required (`STABLE_DIFFUSION_API_KEY` is accepted
    /// as a fallback name); `STABILITY_API_HOST` overrides the API host.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_VAR)
            .or_else(|_| std::env::var(API_KEY_FALLBACK_VAR))
            .map_err(|_| {
                RelightError::Config(format!(
                    "{} not set (set it in the environment or a .env file)",
                    API_KEY_VAR
                ))
            })?;

        if api_key.trim().is_empty() {
            return Err(RelightError::Config(format!("{} is empty", API_KEY_VAR)));
        }

        let host = std::env::var(API_HOST_VAR).unwrap_or_else(|_| DEFAULT_HOST.to_string());

        Ok(Self { api_key, host })
    }

    /// Host with any trailing slash removed
    pub fn host_trimmed(&self) -> &str {
        self.host.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_vars() {
        std::env::remove_var(API_KEY_VAR);
        std::env::remove_var(API_KEY_FALLBACK_VAR);
        std::env::remove_var(API_HOST_VAR);
    }

    #[test]
    #[serial]
    fn missing_key_is_config_error() {
        clear_vars();
        let result = ApiConfig::from_env();
        assert!(matches!(result, Err(RelightError::Config(_))));
    }

    #[test]
    #[serial]
    fn fallback_var_is_honored() {
        clear_vars();
        std::env::set_var(API_KEY_FALLBACK_VAR, "sk-test");
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.host, DEFAULT_HOST);
        clear_vars();
    }

    #[test]
    #[serial]
    fn host_override() {
        clear_vars();
        std::env::set_var(API_KEY_VAR, "sk-test");
        std::env::set_var(API_HOST_VAR, "http://localhost:8080/");
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.host_trimmed(), "http://localhost:8080");
        clear_vars();
    }
}
