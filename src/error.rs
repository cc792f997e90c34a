//! # Error Types
//!
//! Custom error types for the wheelchair joystick driver using `thiserror`.

use std::time::Duration;

use thiserror::Error;

use crate::joystick::Axis;

/// Main error type for the wheelchair joystick driver
#[derive(Debug, Error)]
pub enum JoystickError {
    /// A percentage outside -100..=100 was handed to the virtual joystick.
    /// Nothing is written to the DAC when this is returned.
    #[error("{axis} percentage {value} is out of range (must be between -100 and 100)")]
    OutOfRange { axis: Axis, value: f64 },

    /// The watchdog's own check took longer than the stop timeout
    #[error("watchdog check took {elapsed:?}, longer than the {timeout:?} timeout; reduce load or increase the timeout")]
    WatchdogOverrun { elapsed: Duration, timeout: Duration },

    /// I2C bus or chip errors
    #[error("I2C error: {0}")]
    I2c(String),

    /// Calibration errors
    #[error("Calibration error: {0}")]
    Calibration(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Telemetry and command serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the wheelchair joystick driver
pub type Result<T> = std::result::Result<T, JoystickError>;
