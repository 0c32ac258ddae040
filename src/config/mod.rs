//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, GatewayConfig, LogFormat, LoggingConfig, MetricsConfig, QuotaConfig, ServerConfig,
    StatsConfig, UsageConfig,
};
