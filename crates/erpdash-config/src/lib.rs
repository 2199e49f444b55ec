//! Configuration management for erpdash
//!
//! This module handles loading, validation, and management of
//! erpdash configuration from YAML files.

pub mod error;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub use error::ConfigError;

/// Page sizes offered by list pages when the config does not say otherwise
pub const DEFAULT_PAGE_SIZES: [usize; 4] = [15, 30, 50, 100];

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

/// Upstream ERP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL every endpoint path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Follow `next` links of paginated list responses
    #[serde(default = "default_true")]
    pub follow_pagination: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            follow_pagination: true,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page sizes a table may switch between
    #[serde(default = "default_page_sizes")]
    pub page_sizes: Vec<usize>,
    /// Page size used when the request does not pick one
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_sizes: default_page_sizes(),
            default_page_size: default_page_size(),
        }
    }
}

fn default_page_sizes() -> Vec<usize> {
    DEFAULT_PAGE_SIZES.to_vec()
}

fn default_page_size() -> usize {
    15
}

/// Currency and number formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Currency symbol
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Number of decimal places
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    /// Thousands separator
    #[serde(default = "default_thousands_sep")]
    pub thousands_separator: String,
    /// Decimal separator
    #[serde(default = "default_decimal_sep")]
    pub decimal_separator: String,
    /// Currency symbol position ("before" or "after")
    #[serde(default)]
    pub symbol_position: SymbolPosition,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            decimal_places: default_decimal_places(),
            thousands_separator: default_thousands_sep(),
            decimal_separator: default_decimal_sep(),
            symbol_position: SymbolPosition::Before,
        }
    }
}

fn default_symbol() -> String {
    "$".to_string()
}

fn default_decimal_places() -> u32 {
    2
}

fn default_thousands_sep() -> String {
    ",".to_string()
}

fn default_decimal_sep() -> String {
    ".".to_string()
}

/// Currency symbol position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPosition {
    #[default]
    Before,
    After,
}

impl std::str::FromStr for SymbolPosition {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "before" => Ok(SymbolPosition::Before),
            "after" => Ok(SymbolPosition::After),
            _ => Err(format!("Invalid symbol position: {}", s)),
        }
    }
}

impl std::fmt::Display for SymbolPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolPosition::Before => write!(f, "before"),
            SymbolPosition::After => write!(f, "after"),
        }
    }
}

/// Date rendering patterns (chrono strftime syntax)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateConfig {
    #[serde(default = "default_short_format")]
    pub short_format: String,
    #[serde(default = "default_medium_format")]
    pub medium_format: String,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            short_format: default_short_format(),
            medium_format: default_medium_format(),
        }
    }
}

fn default_short_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_medium_format() -> String {
    "%b %d, %Y".to_string()
}

/// Analytics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Days of stock movements shown by the movement analytics view
    #[serde(default = "default_movement_window")]
    pub movement_window_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            movement_window_days: default_movement_window(),
        }
    }
}

fn default_movement_window() -> u32 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream API settings
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Pagination settings
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Currency settings
    #[serde(default)]
    pub currency: CurrencyConfig,
    /// Date formats
    #[serde(default)]
    pub dates: DateConfig,
    /// Analytics settings
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::IoError
            }
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        let base_url = self.upstream.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "upstream.base_url".to_string(),
                reason: "Base URL must start with http:// or https://".to_string(),
            });
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "upstream.timeout_secs".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if self.pagination.page_sizes.is_empty() {
            return Err(ConfigError::MissingField {
                field: "pagination.page_sizes".to_string(),
            });
        }

        if self.pagination.page_sizes.iter().any(|&size| size == 0) {
            return Err(ConfigError::InvalidValue {
                field: "pagination.page_sizes".to_string(),
                reason: "Page sizes must be greater than 0".to_string(),
            });
        }

        if !self
            .pagination
            .page_sizes
            .contains(&self.pagination.default_page_size)
        {
            return Err(ConfigError::InvalidValue {
                field: "pagination.default_page_size".to_string(),
                reason: "Default page size must be one of pagination.page_sizes".to_string(),
            });
        }

        if self.currency.decimal_places > 10 {
            return Err(ConfigError::InvalidValue {
                field: "currency.decimal_places".to_string(),
                reason: "Decimal places must be between 0 and 10".to_string(),
            });
        }

        for (field, pattern) in [
            ("dates.short_format", &self.dates.short_format),
            ("dates.medium_format", &self.dates.medium_format),
        ] {
            if let Err(reason) = check_date_pattern(pattern) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason,
                });
            }
        }

        if self.analytics.movement_window_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "analytics.movement_window_days".to_string(),
                reason: "Movement window must be at least one day".to_string(),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Upstream base URL, always ending in a slash so relative paths join under it
    pub fn base_url(&self) -> String {
        let trimmed = self.upstream.base_url.trim();
        if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        }
    }

    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.yaml")
    }
}

/// A date pattern must parse as strftime and render a plain calendar date
fn check_date_pattern(pattern: &str) -> Result<(), String> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(format!("'{}' is not a valid strftime pattern", pattern));
    }
    let sample = NaiveDate::from_ymd_opt(2024, 1, 31).ok_or_else(|| "sample date out of range".to_string())?;
    let mut out = String::new();
    write!(out, "{}", sample.format(pattern))
        .map_err(|_| format!("'{}' uses fields a date cannot supply", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.pagination.page_sizes, vec![15, 30, 50, 100]);
        assert_eq!(config.pagination.default_page_size, 15);
        assert_eq!(config.currency.symbol, "$");
        assert_eq!(config.currency.decimal_places, 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_template_is_valid() {
        let config = Config::from_yaml(Config::generate_default()).unwrap();
        assert_eq!(config.upstream.timeout_secs, 30);
        assert!(config.upstream.follow_pagination);
        assert_eq!(config.analytics.movement_window_days, 30);
        assert_eq!(config.dates.medium_format, "%b %d, %Y");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::from_yaml("server:\n  port: 9000\ncurrency:\n  symbol: \"€\"\n  symbol_position: after\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.currency.symbol, "€");
        assert_eq!(config.currency.symbol_position, SymbolPosition::After);
        assert_eq!(config.currency.thousands_separator, ",");
    }

    #[test]
    fn test_rejects_zero_port() {
        let err = Config::from_yaml("server:\n  port: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "server.port"));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let err = Config::from_yaml("upstream:\n  base_url: \"ftp://erp\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "upstream.base_url"));
    }

    #[test]
    fn test_rejects_unusable_date_patterns() {
        let err = Config::from_yaml("dates:\n  short_format: \"%Y-%m-%d %H:%M\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "dates.short_format"));

        let err = Config::from_yaml("dates:\n  medium_format: \"%Q %Y\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "dates.medium_format"));

        assert!(Config::from_yaml("dates:\n  short_format: \"%d/%m/%Y\"\n").is_ok());
    }

    #[test]
    fn test_rejects_default_page_size_outside_choices() {
        let err = Config::from_yaml("pagination:\n  page_sizes: [10, 20]\n  default_page_size: 15\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "pagination.default_page_size"));
    }

    #[test]
    fn test_rejects_empty_page_sizes() {
        let err = Config::from_yaml("pagination:\n  page_sizes: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Config::from_yaml("server: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidYaml { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/definitely/not/here/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = Config::from_yaml("upstream:\n  base_url: \"https://erp.example.com/v1\"\n").unwrap();
        assert_eq!(config.base_url(), "https://erp.example.com/v1/");
    }
}
