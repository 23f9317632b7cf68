use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `TRACKLENS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickHouseConfig {
    #[serde(default = "default_clickhouse_url")]
    pub url: String,
    #[serde(default = "default_clickhouse_db")]
    pub database: String,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// Row limit applied when the caller does not supply one.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Upper bound any caller-supplied limit is clamped into.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

// Default functions
fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}
fn default_clickhouse_db() -> String {
    "tracklens".to_string()
}
fn default_query_timeout_ms() -> u64 {
    30_000
}
fn default_limit() -> u32 {
    500
}
fn default_max_limit() -> u32 {
    10_000
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_clickhouse_url(),
            database: default_clickhouse_db(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            clickhouse: ClickHouseConfig::default(),
            reporting: ReportingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("TRACKLENS")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.clickhouse.database, "tracklens");
        assert_eq!(config.reporting.default_limit, 500);
        assert!(config.reporting.default_limit <= config.reporting.max_limit);
    }
}
