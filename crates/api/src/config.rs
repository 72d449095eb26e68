//! Application configuration loaded from environment variables.

use std::str::FromStr;

use analytics::AnalyticsConfig;
use domain::RandomCodeGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `"0.0.0.0"`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `DATABASE_URL`: PostgreSQL ledger; unset runs on the in-memory ledger
/// - `CODE_LENGTH`: pickup/delivery code length (default 6, clamped to 4..=12)
/// - `ANALYTICS_UTC_OFFSET_MINUTES`: where analytics days begin (default 0)
/// - `ANALYTICS_MAX_WINDOW_DAYS`: largest `days` accepted (default 365)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub code_length: usize,
    pub analytics_utc_offset_minutes: i32,
    pub analytics_max_window_days: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unparseable values fall back to
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            code_length: parse_var(&lookup, "CODE_LENGTH")
                .unwrap_or(defaults.code_length)
                .clamp(RandomCodeGenerator::MIN_LENGTH, RandomCodeGenerator::MAX_LENGTH),
            analytics_utc_offset_minutes: parse_var(&lookup, "ANALYTICS_UTC_OFFSET_MINUTES")
                .unwrap_or(defaults.analytics_utc_offset_minutes),
            analytics_max_window_days: parse_var(&lookup, "ANALYTICS_MAX_WINDOW_DAYS")
                .unwrap_or(defaults.analytics_max_window_days),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn analytics(&self) -> AnalyticsConfig {
        AnalyticsConfig::new(
            self.analytics_utc_offset_minutes,
            self.analytics_max_window_days,
        )
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            code_length: RandomCodeGenerator::DEFAULT_LENGTH,
            analytics_utc_offset_minutes: 0,
            analytics_max_window_days: AnalyticsConfig::DEFAULT_MAX_WINDOW_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = from_pairs(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.database_url, None);
        assert_eq!(config.code_length, 6);
        assert_eq!(config.analytics_max_window_days, 365);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("PORT", "8080"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/ledger"),
            ("CODE_LENGTH", "99"),
            ("ANALYTICS_UTC_OFFSET_MINUTES", "-300"),
            ("ANALYTICS_MAX_WINDOW_DAYS", "90"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/ledger"));
        assert_eq!(config.code_length, 12);
        assert_eq!(config.analytics().utc_offset.local_minus_utc(), -300 * 60);
        assert_eq!(config.analytics().max_window_days, 90);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = from_pairs(&[("PORT", "http"), ("DATABASE_URL", "  ")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
