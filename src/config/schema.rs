//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::manager::{DEFAULT_ADDRESSES, SLOT_COUNT};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parallel port configuration
    pub ports: PortsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check values that serde cannot check on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        self.ports.validate()?;
        self.logging.validate()
    }
}

/// Parallel port configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// Device paths of slots 0, 1 and 2 in multi-port mode
    pub addresses: [String; SLOT_COUNT],
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            addresses: DEFAULT_ADDRESSES.map(String::from),
        }
    }
}

impl PortsConfig {
    fn validate(&self) -> ConfigResult<()> {
        for (index, address) in self.addresses.iter().enumerate() {
            if address.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("ports.addresses[{index}]"),
                    "device address must not be empty",
                ));
            }
            if self.addresses[..index].contains(address) {
                return Err(ConfigError::validation(
                    format!("ports.addresses[{index}]"),
                    format!("'{address}' is already used by another slot"),
                ));
            }
        }
        Ok(())
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::validation("logging.level", "must not be empty"));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}' (expected json, pretty or compact)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(
            config.ports.addresses,
            ["/dev/parport0", "/dev/parport1", "/dev/parport4"].map(String::from)
        );
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[ports]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [ports]
            addresses = ["/dev/parport0", "/dev/parport2", "/dev/parport3"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ports.addresses[1], "/dev/parport2");
        // Defaults should still work
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_wrong_slot_count_rejected() {
        let toml_str = r#"
            [ports]
            addresses = ["/dev/parport0", "/dev/parport1"]
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let mut config = Config::default();
        config.ports.addresses[2] = "/dev/parport0".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ports.addresses[2]"));
    }

    #[test]
    fn test_empty_address_rejected() {
        let mut config = Config::default();
        config.ports.addresses[0] = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
