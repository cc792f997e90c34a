//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::command::DEFAULT_VELOCITY_SCALE;
use crate::error::{JoystickError, Result};
use crate::hardware::ads1015::ADS1015_DEFAULT_ADDRESS;
use crate::hardware::i2c::I2C_MAX_ADDRESS;
use crate::hardware::mcp4728::MCP4728_DEFAULT_ADDRESS;
use crate::joystick::{DEFAULT_CALIBRATION_SAMPLES, DEFAULT_DEVIATION_THRESHOLD};
use crate::telemetry::DEFAULT_TELEMETRY_RATE_HZ;
use crate::watchdog::{DEFAULT_WATCHDOG_PERIOD, DEFAULT_WATCHDOG_TIMEOUT};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub i2c: I2cConfig,
    pub joystick: JoystickConfig,
    pub calibration: CalibrationConfig,
    pub command: CommandConfig,
    pub watchdog: WatchdogConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

/// I2C bus configuration
#[derive(Debug, Deserialize, Clone)]
pub struct I2cConfig {
    #[serde(default = "default_i2c_bus")]
    pub bus: String,

    #[serde(default = "default_adc_address")]
    pub adc_address: u8,

    #[serde(default = "default_dac_address")]
    pub dac_address: u8,
}

/// Joystick signal configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JoystickConfig {
    #[serde(default = "default_deviation_threshold")]
    pub deviation_threshold: f64,
}

/// Calibration configuration
///
/// Set both centers to skip calibration at startup; leave both out to
/// calibrate.
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub forward_back_center: Option<i32>,

    #[serde(default)]
    pub left_right_center: Option<i32>,

    #[serde(default = "default_calibration_samples")]
    pub samples: usize,
}

/// Command configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CommandConfig {
    #[serde(default = "default_velocity_scale")]
    pub velocity_scale: f64,
}

/// Watchdog configuration
#[derive(Debug, Deserialize, Clone)]
pub struct WatchdogConfig {
    #[serde(default = "default_watchdog_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_watchdog_period_ms")]
    pub period_ms: u64,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_telemetry_rate_hz")]
    pub rate_hz: u32,

    /// File to append JSON lines to, or "-" for stdout
    #[serde(default = "default_telemetry_output")]
    pub output: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty logs to stderr
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_i2c_bus() -> String { "/dev/i2c-1".to_string() }
fn default_adc_address() -> u8 { ADS1015_DEFAULT_ADDRESS }
fn default_dac_address() -> u8 { MCP4728_DEFAULT_ADDRESS }

fn default_deviation_threshold() -> f64 { DEFAULT_DEVIATION_THRESHOLD }

fn default_calibration_samples() -> usize { DEFAULT_CALIBRATION_SAMPLES }

fn default_velocity_scale() -> f64 { DEFAULT_VELOCITY_SCALE }

fn default_watchdog_timeout_ms() -> u64 { DEFAULT_WATCHDOG_TIMEOUT.as_millis() as u64 }
fn default_watchdog_period_ms() -> u64 { DEFAULT_WATCHDOG_PERIOD.as_millis() as u64 }

fn default_telemetry_enabled() -> bool { true }
fn default_telemetry_rate_hz() -> u32 { DEFAULT_TELEMETRY_RATE_HZ }
fn default_telemetry_output() -> String { "-".to_string() }

fn default_log_level() -> String { "info".to_string() }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl CalibrationConfig {
    /// Configured centers as `(forward_back, left_right)`, if both are set.
    pub fn centers(&self) -> Option<(i32, i32)> {
        match (self.forward_back_center, self.left_right_center) {
            (Some(fb), Some(lr)) => Some((fb, lr)),
            _ => None,
        }
    }
}

impl WatchdogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

fn invalid(msg: impl std::fmt::Display) -> JoystickError {
    JoystickError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wheelchair_joystick::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate I2C configuration
        if self.i2c.bus.is_empty() {
            return Err(invalid("i2c bus cannot be empty"));
        }

        for (name, address) in [
            ("adc_address", self.i2c.adc_address),
            ("dac_address", self.i2c.dac_address),
        ] {
            if address > I2C_MAX_ADDRESS {
                return Err(invalid(format!("{} must be a 7-bit address (0x00-0x7F)", name)));
            }
        }

        if self.i2c.adc_address == self.i2c.dac_address {
            return Err(invalid("adc_address and dac_address must differ"));
        }

        // Validate deviation threshold
        let threshold = self.joystick.deviation_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 2048.0 {
            return Err(invalid("deviation_threshold must be greater than 0 and at most 2048"));
        }

        // Calibration centers come as a pair
        if self.calibration.forward_back_center.is_some() != self.calibration.left_right_center.is_some() {
            return Err(invalid(
                "forward_back_center and left_right_center must be set together",
            ));
        }

        if self.calibration.samples == 0 || self.calibration.samples > 65536 {
            return Err(invalid("calibration samples must be between 1 and 65536"));
        }

        // Validate velocity scale
        let scale = self.command.velocity_scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(invalid("velocity_scale must be greater than 0"));
        }

        // Validate watchdog timing
        if self.watchdog.timeout_ms == 0 || self.watchdog.timeout_ms > 60000 {
            return Err(invalid("watchdog timeout_ms must be between 1 and 60000"));
        }

        if self.watchdog.period_ms == 0 || self.watchdog.period_ms >= self.watchdog.timeout_ms {
            return Err(invalid("watchdog period_ms must be at least 1 and less than timeout_ms"));
        }

        // Validate telemetry configuration
        if self.telemetry.rate_hz == 0 || self.telemetry.rate_hz > 100 {
            return Err(invalid("telemetry rate_hz must be between 1 and 100"));
        }

        if self.telemetry.enabled && self.telemetry.output.is_empty() {
            return Err(invalid("telemetry output cannot be empty when enabled"));
        }

        // Validate log level
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "log level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            i2c: I2cConfig {
                bus: default_i2c_bus(),
                adc_address: default_adc_address(),
                dac_address: default_dac_address(),
            },
            joystick: JoystickConfig {
                deviation_threshold: default_deviation_threshold(),
            },
            calibration: CalibrationConfig {
                forward_back_center: None,
                left_right_center: None,
                samples: default_calibration_samples(),
            },
            command: CommandConfig {
                velocity_scale: default_velocity_scale(),
            },
            watchdog: WatchdogConfig {
                timeout_ms: default_watchdog_timeout_ms(),
                period_ms: default_watchdog_period_ms(),
            },
            telemetry: TelemetryConfig {
                enabled: default_telemetry_enabled(),
                rate_hz: default_telemetry_rate_hz(),
                output: default_telemetry_output(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                log_dir: String::new(),
            },
        }
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[i2c]
bus = "/dev/i2c-0"

[joystick]

[calibration]
forward_back_center = 1240
left_right_center = 1228

[command]

[watchdog]
timeout_ms = 1000

[telemetry]

[logging]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.i2c.bus, "/dev/i2c-0");
        assert_eq!(config.calibration.centers(), Some((1240, 1228)));
        assert_eq!(config.watchdog.timeout(), Duration::from_secs(1));
        assert_eq!(config.watchdog.period(), Duration::from_millis(100));
    }

    #[test]
    fn test_load_shipped_default_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.calibration.centers(), None);
        assert_eq!(config.watchdog.timeout_ms, 2000);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/wheelchair.toml");
        assert!(matches!(result, Err(JoystickError::Io(_))));
    }

    #[test]
    fn test_load_malformed_toml() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[i2c\nbus = ").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(JoystickError::Config(_))));
    }

    #[test]
    fn test_centers_absent_means_calibrate() {
        let config = create_valid_config();
        assert_eq!(config.calibration.centers(), None);
    }

    #[test]
    fn test_partial_calibration_rejected() {
        let mut config = create_valid_config();
        config.calibration.forward_back_center = Some(1233);
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.calibration.left_right_center = Some(1232);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_any_center_values_accepted() {
        // -1 is an ordinary center now, not a "not calibrated" marker
        let mut config = create_valid_config();
        config.calibration.forward_back_center = Some(-1);
        config.calibration.left_right_center = Some(-1);
        assert!(config.validate().is_ok());
        assert_eq!(config.calibration.centers(), Some((-1, -1)));
    }

    #[test]
    fn test_empty_bus() {
        let mut config = create_valid_config();
        config.i2c.bus = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ten_bit_address() {
        let mut config = create_valid_config();
        config.i2c.dac_address = 0x80;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_same_adc_and_dac_address() {
        let mut config = create_valid_config();
        config.i2c.dac_address = config.i2c.adc_address;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deviation_threshold_zero() {
        let mut config = create_valid_config();
        config.joystick.deviation_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deviation_threshold_nan() {
        let mut config = create_valid_config();
        config.joystick.deviation_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_calibration_samples_zero() {
        let mut config = create_valid_config();
        config.calibration.samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_velocity_scale_negative() {
        let mut config = create_valid_config();
        config.command.velocity_scale = -10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watchdog_timeout_zero() {
        let mut config = create_valid_config();
        config.watchdog.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watchdog_timeout_too_high() {
        let mut config = create_valid_config();
        config.watchdog.timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watchdog_period_not_shorter_than_timeout() {
        let mut config = create_valid_config();
        config.watchdog.period_ms = config.watchdog.timeout_ms;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watchdog_period_zero() {
        let mut config = create_valid_config();
        config.watchdog.period_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_telemetry_rate_zero() {
        let mut config = create_valid_config();
        config.telemetry.rate_hz = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_telemetry_output_when_enabled() {
        let mut config = create_valid_config();
        config.telemetry.output = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_telemetry_output_when_disabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = false;
        config.telemetry.output = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        for level in LOG_LEVELS {
            let mut config = create_valid_config();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_i2c_bus(), "/dev/i2c-1");
        assert_eq!(default_adc_address(), 0x48);
        assert_eq!(default_dac_address(), 0x60);
        assert_eq!(default_deviation_threshold(), 15.0);
        assert_eq!(default_calibration_samples(), 1024);
        assert_eq!(default_velocity_scale(), 10.0);
        assert_eq!(default_watchdog_timeout_ms(), 2000);
        assert_eq!(default_watchdog_period_ms(), 100);
        assert_eq!(default_telemetry_enabled(), true);
        assert_eq!(default_telemetry_rate_hz(), 10);
        assert_eq!(default_telemetry_output(), "-");
        assert_eq!(default_log_level(), "info");
    }
}
