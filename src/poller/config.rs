//! Polling session configuration

use crate::stability::options::OutputFormat;
use crate::stability::types::AcceptMode;
use std::path::PathBuf;
use std::time::Duration;

/// Default attempt budget for a standalone poll
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Documented rate-limit floor of the result endpoint
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Polling session configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Maximum number of poll attempts before the session is abandoned
    pub max_attempts: u32,

    /// Minimum delay between consecutive attempts
    pub interval: Duration,

    /// Result encodings the caller accepts
    pub accept: AcceptMode,

    /// Directory result files are written to
    pub output_dir: PathBuf,

    /// Extension for artifacts whose encoding the response does not declare
    pub output_format: OutputFormat,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            accept: AcceptMode::Either,
            output_dir: PathBuf::from("."),
            output_format: OutputFormat::Png,
        }
    }
}

impl PollerConfig {
    /// Create a new config builder
    pub fn builder() -> PollerConfigBuilder {
        PollerConfigBuilder::default()
    }
}

/// Builder for PollerConfig
#[derive(Default)]
pub struct PollerConfigBuilder {
    config: PollerConfig,
}

impl PollerConfigBuilder {
    /// Set the attempt budget
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    /// Set the inter-attempt delay
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Set the inter-attempt delay in seconds
    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.config.interval = Duration::from_secs(secs);
        self
    }

    /// Set the accepted result encodings
    pub fn accept(mut self, accept: AcceptMode) -> Self {
        self.config.accept = accept;
        self
    }

    /// Set the output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set the fallback output format for undeclared artifact encodings
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Build the config
    pub fn build(self) -> PollerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_rate_floor() {
        let config = PollerConfig::default();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.interval, Duration::from_secs(10));
    }

    #[test]
    fn builder_overrides() {
        let config = PollerConfig::builder()
            .max_attempts(30)
            .interval_secs(15)
            .output_dir("/tmp/results")
            .build();
        assert_eq!(config.max_attempts, 30);
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/results"));
    }
}
