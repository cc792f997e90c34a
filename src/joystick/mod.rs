//! # Joystick Module
//!
//! The virtual joystick: redundant sensor fusion, percentage scaling,
//! DAC output and the fail-safe lockout.
//!
//! This module handles:
//! - Reading both sensors of each axis and checking them against each other
//! - Converting between raw units and percentages (-100 to 100)
//! - Driving the four DAC outputs, two per axis
//! - Calibrating the center of each axis at rest
//!
//! ## Value Ranges
//!
//! - ADC samples: 16-bit scale, divided by 16 to 12-bit raw units
//! - Full deflection: 720 raw units either side of the calibrated center
//! - DAC output: 16-bit, `16 × raw × 2`
//!
//! ## Usage
//!
//! ```no_run
//! use wheelchair_joystick::hardware::ads1015::{Ads1015, ADS1015_DEFAULT_ADDRESS};
//! use wheelchair_joystick::hardware::i2c::open_bus;
//! use wheelchair_joystick::hardware::mcp4728::{Mcp4728, MCP4728_DEFAULT_ADDRESS};
//! use wheelchair_joystick::joystick::JoystickSignal;
//!
//! let adc = Ads1015::new(open_bus("/dev/i2c-1")?, ADS1015_DEFAULT_ADDRESS);
//! let dac = Mcp4728::new(open_bus("/dev/i2c-1")?, MCP4728_DEFAULT_ADDRESS);
//! let joystick = JoystickSignal::new(adc, dac);
//!
//! joystick.set_percent(25.0, 0.0)?;
//! let percent = joystick.get_percent()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod axis;
pub mod calibration;
pub mod signal;

use std::fmt;

pub use axis::{AxisCalibration, JoystickCalibration, RawSample, RedundantAxis};
pub use calibration::{Calibrator, DEFAULT_CALIBRATION_SAMPLES};
pub use signal::JoystickSignal;

use crate::hardware::DacFrame;

/// ADC samples are 12-bit conversions on a 16-bit scale.
pub const ADC_BIT_DIVISOR: f64 = 16.0;

/// Raw units to 16-bit DAC words.
pub const DAC_BIT_MULTIPLIER: f64 = 16.0;

/// DAC output voltage ratio relative to the sensor voltage.
pub const DAC_OUTPUT_GAIN: f64 = 2.0;

/// Raw units between center and full deflection.
pub const FULL_DEFLECTION: f64 = 720.0;

/// Largest percentage either axis accepts or reports.
pub const PERCENT_MAX: f64 = 100.0;

/// Smallest percentage either axis accepts or reports.
pub const PERCENT_MIN: f64 = -100.0;

/// Sensor disagreement, in raw units, at which an axis is faulted.
pub const DEFAULT_DEVIATION_THRESHOLD: f64 = 15.0;

/// Forward/back center of the reference joystick.
pub const DEFAULT_FORWARD_BACK_CENTER: i32 = 1233;

/// Left/right center of the reference joystick.
pub const DEFAULT_LEFT_RIGHT_CENTER: i32 = 1232;

/// Fail-safe output: both axes pulled apart to a deflection no real
/// joystick can produce, which the motor controller treats as a halt.
pub const LOCKOUT_FRAME: DacFrame = [u16::MAX, 0, 0, u16::MAX];

/// A joystick degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    ForwardBack,
    LeftRight,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForwardBack => write!(f, "forward/back"),
            Self::LeftRight => write!(f, "left/right"),
        }
    }
}

/// Joystick position as percentages of full deflection.
///
/// Positive left/right is a left turn, matching positive angular velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PercentCommand {
    pub forward_back: f64,
    pub left_right: f64,
}

impl PercentCommand {
    /// Centered joystick.
    pub const NEUTRAL: PercentCommand = PercentCommand {
        forward_back: 0.0,
        left_right: 0.0,
    };

    #[must_use]
    pub fn new(forward_back: f64, left_right: f64) -> Self {
        Self {
            forward_back,
            left_right,
        }
    }
}

/// Whether `value` is an acceptable percentage. NaN is not.
#[inline]
#[must_use]
pub fn is_valid_percent(value: f64) -> bool {
    (PERCENT_MIN..=PERCENT_MAX).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_bounds_are_inclusive() {
        assert!(is_valid_percent(100.0));
        assert!(is_valid_percent(-100.0));
        assert!(is_valid_percent(0.0));
        assert!(!is_valid_percent(100.01));
        assert!(!is_valid_percent(-100.01));
        assert!(!is_valid_percent(f64::NAN));
        assert!(!is_valid_percent(f64::INFINITY));
    }

    #[test]
    fn test_lockout_frame_is_max_min_min_max() {
        assert_eq!(LOCKOUT_FRAME, [65535, 0, 0, 65535]);
    }

    #[test]
    fn test_axis_display() {
        assert_eq!(Axis::ForwardBack.to_string(), "forward/back");
        assert_eq!(Axis::LeftRight.to_string(), "left/right");
    }
}
