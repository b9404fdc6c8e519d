// src/config.rs - Telemetry host configuration
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for the telemetry host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub serial: SerialEndpointConfig,

    /// How often the host binary polls for a full snapshot.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Serial endpoint parameters for the machine controller.
///
/// Parity is fixed at none and stop bits at one; the controller accepts
/// nothing else, so neither is configurable.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialEndpointConfig {
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_baud")]
    pub baud: u32,

    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Wait between writing a command and reading the reply. The controller
    /// sends no acknowledgement, so this is an empirical constant; it stays
    /// configurable rather than hard-coded.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

// Default value functions
fn default_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud() -> u32 { 9600 }
fn default_data_bits() -> u8 { 7 }
fn default_read_timeout_ms() -> u64 { 2000 }
fn default_write_timeout_ms() -> u64 { 1000 }
fn default_settle_delay_ms() -> u64 { 1000 }
fn default_poll_interval_ms() -> u64 { 10000 }

impl Default for SerialEndpointConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: default_baud(),
            data_bits: default_data_bits(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            serial: SerialEndpointConfig::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl SerialEndpointConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl TelemetryConfig {
    /// Load configuration from a TOML file.
    pub fn load(config_path: &str) -> Result<Self, ConfigError> {
        let mut file = File::open(config_path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: TelemetryConfig = toml::from_str(&contents)?;
        tracing::info!("Loaded configuration from: {}", config_path);
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.port.is_empty() {
            return Err(ConfigError::Invalid(
                "serial port must be specified".to_string(),
            ));
        }

        if self.serial.baud == 0 {
            return Err(ConfigError::Invalid(
                "baud rate must be positive".to_string(),
            ));
        }

        if !(5..=8).contains(&self.serial.data_bits) {
            return Err(ConfigError::Invalid(format!(
                "data_bits must be between 5 and 8, got {}",
                self.serial.data_bits
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud, 9600);
        assert_eq!(config.serial.data_bits, 7);
        assert_eq!(config.serial.read_timeout_ms, 2000);
        assert_eq!(config.serial.write_timeout_ms, 1000);
        assert_eq!(config.serial.settle_delay_ms, 1000);
        assert_eq!(config.poll_interval_ms, 10000);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml_config = r#"
poll_interval_ms = 5000

[serial]
port = "/dev/ttyS1"
baud = 115200
data_bits = 8
settle_delay_ms = 250
        "#;

        let config: TelemetryConfig = toml::from_str(toml_config).unwrap();

        assert_eq!(config.serial.port, "/dev/ttyS1");
        assert_eq!(config.serial.baud, 115200);
        assert_eq!(config.serial.data_bits, 8);
        assert_eq!(config.serial.settle_delay_ms, 250);
        // Omitted keys fall back to defaults
        assert_eq!(config.serial.read_timeout_ms, 2000);
        assert_eq!(config.poll_interval_ms, 5000);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[serial]\nport = \"/dev/ttyACM0\"").unwrap();

        let config = TelemetryConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud, 9600);
    }

    #[test]
    fn test_config_validation() {
        let mut config = TelemetryConfig::default();
        assert!(config.validate().is_ok());

        config.serial.port = String::new();
        assert!(config.validate().is_err());
        config.serial.port = "/dev/ttyUSB0".to_string();

        config.serial.baud = 0;
        assert!(config.validate().is_err());
        config.serial.baud = 9600;

        config.serial.data_bits = 9;
        assert!(config.validate().is_err());
        config.serial.data_bits = 7;

        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_accessors() {
        let config = SerialEndpointConfig::default();
        assert_eq!(config.read_timeout(), Duration::from_millis(2000));
        assert_eq!(config.write_timeout(), Duration::from_millis(1000));
        assert_eq!(config.settle_delay(), Duration::from_millis(1000));
    }
}
