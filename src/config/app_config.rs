use serde::Deserialize;

use crate::domain::quota::{ConsumptionPolicy, MAX_PERIOD_SECONDS};
use crate::domain::stats::Bucketing;
use crate::domain::{ApiDefinition, DomainError};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Quota ledger settings
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Length of a quota period
    #[serde(default = "default_period_seconds")]
    pub period_seconds: u64,
    /// Which requests consume quota
    #[serde(default)]
    pub consumption: ConsumptionPolicy,
}

/// Stats bucketing
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_bucket_seconds")]
    pub bucket_seconds: u64,
    /// Unix timestamp of bucket 0
    #[serde(default)]
    pub origin: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsageConfig {
    /// Events buffered between the request path and the recorder worker
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Events retained by the in-memory log
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Public base URL callable API URLs are derived from
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Catalog entries loaded at startup
    #[serde(default)]
    pub apis: Vec<ApiDefinition>,
}

/// Prometheus metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_period_seconds() -> u64 {
    86_400
}

fn default_bucket_seconds() -> u64 {
    3_600
}

fn default_channel_capacity() -> usize {
    10_000
}

fn default_max_events() -> usize {
    100_000
}

fn default_base_url() -> String {
    "http://localhost:8080/gw".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            period_seconds: default_period_seconds(),
            consumption: ConsumptionPolicy::default(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            bucket_seconds: default_bucket_seconds(),
            origin: 0,
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            max_events: default_max_events(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            apis: Vec::new(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_metrics_path(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Self::environment())
    }

    /// `APP__`-prefixed environment source with `__` between nested keys
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true)
    }

    /// Layer the optional config files under the given environment source
    pub fn load_from(environment: config::Environment) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(environment)
            .build()?;

        config.try_deserialize()
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quota.period_seconds == 0 {
            return Err(DomainError::invalid_config("quota.period_seconds must be positive"));
        }

        if self.stats.bucket_seconds == 0 {
            return Err(DomainError::invalid_config("stats.bucket_seconds must be positive"));
        }

        if self.quota.period_seconds > MAX_PERIOD_SECONDS {
            return Err(DomainError::invalid_config(format!(
                "quota.period_seconds must not exceed {}, got {}",
                MAX_PERIOD_SECONDS, self.quota.period_seconds
            )));
        }

        let bucket_seconds = i64::try_from(self.stats.bucket_seconds)
            .map_err(|_| DomainError::invalid_config("stats.bucket_seconds is out of range"))?;
        Bucketing::new(self.stats.origin, bucket_seconds)?;

        if self.usage.channel_capacity == 0 {
            return Err(DomainError::invalid_config("usage.channel_capacity must be positive"));
        }

        if !self.metrics.path.starts_with('/') {
            return Err(DomainError::invalid_config(format!(
                "metrics.path must start with '/', got '{}'",
                self.metrics.path
            )));
        }

        Ok(())
    }
}
