//! Configuration management for ledgerdesk
//!
//! Loads and validates the YAML configuration shared by the API server,
//! the store and the report exporters.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::{ConfigError, ConfigResult};

// ==================== Configuration Types ====================

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow cross-origin requests from the web front end
    #[serde(default = "default_true")]
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_permissive: true,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the ledger snapshot
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
    /// Snapshot file name (JSON)
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    /// Write the snapshot back after every successful mutation
    #[serde(default = "default_false")]
    pub persist_on_write: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            snapshot_file: default_snapshot_file(),
            persist_on_write: false,
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_snapshot_file() -> String {
    "ledger.json".to_string()
}

/// Bookkeeping rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Maximum |debit - credit| still considered balanced
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: f64,
    /// Minimum number of lines in a journal entry
    #[serde(default = "default_min_entry_lines")]
    pub min_entry_lines: usize,
    /// Reject postings to inactive accounts
    #[serde(default = "default_true")]
    pub reject_inactive_accounts: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: default_balance_tolerance(),
            min_entry_lines: default_min_entry_lines(),
            reject_inactive_accounts: true,
        }
    }
}

fn default_balance_tolerance() -> f64 {
    0.001
}

fn default_min_entry_lines() -> usize {
    2
}

/// Named reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodPreset {
    CurrentMonth,
    PreviousMonth,
    CurrentQuarter,
    YearToDate,
    PreviousYear,
    /// Explicit start/end supplied by the caller
    Custom,
}

impl Default for PeriodPreset {
    fn default() -> Self {
        PeriodPreset::CurrentMonth
    }
}

impl std::str::FromStr for PeriodPreset {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "current_month" | "month" => Ok(PeriodPreset::CurrentMonth),
            "previous_month" | "last_month" => Ok(PeriodPreset::PreviousMonth),
            "current_quarter" | "quarter" => Ok(PeriodPreset::CurrentQuarter),
            "year_to_date" | "ytd" => Ok(PeriodPreset::YearToDate),
            "previous_year" | "last_year" => Ok(PeriodPreset::PreviousYear),
            "custom" => Ok(PeriodPreset::Custom),
            _ => Err(format!("Invalid period: {}", s)),
        }
    }
}

impl std::fmt::Display for PeriodPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodPreset::CurrentMonth => write!(f, "current_month"),
            PeriodPreset::PreviousMonth => write!(f, "previous_month"),
            PeriodPreset::CurrentQuarter => write!(f, "current_quarter"),
            PeriodPreset::YearToDate => write!(f, "year_to_date"),
            PeriodPreset::PreviousYear => write!(f, "previous_year"),
            PeriodPreset::Custom => write!(f, "custom"),
        }
    }
}

/// Report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default)]
    pub default_period: PeriodPreset,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_decimal_places")]
    pub decimal_places: usize,
    #[serde(default = "default_thousands_sep")]
    pub thousands_separator: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            default_period: PeriodPreset::CurrentMonth,
            currency: default_currency(),
            decimal_places: default_decimal_places(),
            thousands_separator: default_thousands_sep(),
        }
    }
}

fn default_currency() -> String {
    "SAR".to_string()
}

fn default_decimal_places() -> usize {
    2
}

fn default_thousands_sep() -> String {
    ",".to_string()
}

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Prefix delimited text with a UTF-8 byte-order mark (spreadsheet apps need it for Arabic text)
    #[serde(default = "default_true")]
    pub include_bom: bool,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Rows per page in document exports
    #[serde(default = "default_rows_per_page")]
    pub rows_per_page: usize,
    /// Lay document exports out right-to-left
    #[serde(default = "default_false")]
    pub right_to_left: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_bom: true,
            delimiter: default_delimiter(),
            rows_per_page: default_rows_per_page(),
            right_to_left: false,
        }
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_rows_per_page() -> usize {
    40
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
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
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if !(self.ledger.balance_tolerance > 0.0 && self.ledger.balance_tolerance < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "ledger.balance_tolerance".to_string(),
                reason: "Tolerance must be positive and below 1".to_string(),
            });
        }

        if self.ledger.min_entry_lines < 2 {
            return Err(ConfigError::InvalidValue {
                field: "ledger.min_entry_lines".to_string(),
                reason: "A double-entry posting needs at least 2 lines".to_string(),
            });
        }

        if self.reports.decimal_places > 6 {
            return Err(ConfigError::InvalidValue {
                field: "reports.decimal_places".to_string(),
                reason: "Decimal places must be between 0 and 6".to_string(),
            });
        }

        if self.reports.default_period == PeriodPreset::Custom {
            return Err(ConfigError::InvalidValue {
                field: "reports.default_period".to_string(),
                reason: "A custom period needs explicit dates and cannot be the default".to_string(),
            });
        }

        if !self.export.delimiter.is_ascii() || self.export.delimiter == '"' {
            return Err(ConfigError::InvalidValue {
                field: "export.delimiter".to_string(),
                reason: "Delimiter must be a single ASCII character other than '\"'".to_string(),
            });
        }

        if self.export.rows_per_page == 0 {
            return Err(ConfigError::InvalidValue {
                field: "export.rows_per_page".to_string(),
                reason: "Rows per page must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Default configuration file contents
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Full path to the ledger snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.data.path.join(&self.data.snapshot_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ledger.balance_tolerance, 0.001);
        assert_eq!(config.ledger.min_entry_lines, 2);
    }

    #[test]
    fn test_default_template_parses() {
        let config = Config::from_yaml(Config::generate_default()).unwrap();
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.reports.default_period, PeriodPreset::CurrentMonth);
        assert!(config.export.include_bom);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = Config::from_yaml("server:\n  port: 9000\nexport:\n  right_to_left: true\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.export.right_to_left);
        assert_eq!(config.export.rows_per_page, 40);
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        let err = Config::from_yaml("ledger:\n  balance_tolerance: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "ledger.balance_tolerance"));
    }

    #[test]
    fn test_rejects_custom_default_period() {
        let err = Config::from_yaml("reports:\n  default_period: custom\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_export_delimiter() {
        let config = Config::from_yaml("export:\n  delimiter: \";\"\n").unwrap();
        assert_eq!(config.export.delimiter, ';');

        let err = Config::from_yaml("export:\n  delimiter: \"؛\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "export.delimiter"));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Config::from_yaml("server: [").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidYaml { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/nonexistent/ledgerdesk.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_period_preset_from_str() {
        assert_eq!("ytd".parse::<PeriodPreset>().unwrap(), PeriodPreset::YearToDate);
        assert_eq!("previous-month".parse::<PeriodPreset>().unwrap(), PeriodPreset::PreviousMonth);
        assert_eq!("current_quarter".parse::<PeriodPreset>().unwrap(), PeriodPreset::CurrentQuarter);
        assert!("fortnight".parse::<PeriodPreset>().is_err());
        assert_eq!(PeriodPreset::PreviousYear.to_string(), "previous_year");
    }
}
