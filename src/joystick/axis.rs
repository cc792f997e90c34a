//! # Redundant Axis
//!
//! One joystick axis as wired on the board: a primary and a secondary
//! sensor on two ADC inputs, and the two DAC outputs that mirror them.
//! Both axes share this type and differ only in their channels and sign.

use super::{
    Axis, ADC_BIT_DIVISOR, DAC_BIT_MULTIPLIER, DAC_OUTPUT_GAIN, DEFAULT_FORWARD_BACK_CENTER,
    DEFAULT_LEFT_RIGHT_CENTER, FULL_DEFLECTION, PERCENT_MAX, PERCENT_MIN,
};
use crate::error::Result;
use crate::hardware::{AnalogChannelReader, AnalogInput, DacChannel};

/// Center position of one axis in raw units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisCalibration {
    pub center: i32,
}

impl AxisCalibration {
    #[must_use]
    pub const fn new(center: i32) -> Self {
        Self { center }
    }
}

/// Centers for both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickCalibration {
    pub forward_back: AxisCalibration,
    pub left_right: AxisCalibration,
}

impl Default for JoystickCalibration {
    fn default() -> Self {
        Self::new(DEFAULT_FORWARD_BACK_CENTER, DEFAULT_LEFT_RIGHT_CENTER)
    }
}

impl JoystickCalibration {
    #[must_use]
    pub const fn new(forward_back_center: i32, left_right_center: i32) -> Self {
        Self {
            forward_back: AxisCalibration::new(forward_back_center),
            left_right: AxisCalibration::new(left_right_center),
        }
    }

    /// Calibration of `axis`.
    #[must_use]
    pub fn for_axis(&self, axis: Axis) -> AxisCalibration {
        match axis {
            Axis::ForwardBack => self.forward_back,
            Axis::LeftRight => self.left_right,
        }
    }
}

/// One read of an axis, in raw (12-bit) units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Primary sensor.
    pub primary: f64,
    /// Primary minus secondary.
    pub secondary_diff: f64,
}

impl RawSample {
    /// Fused measurement: the midpoint between the two sensors.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.primary - self.secondary_diff / 2.0
    }

    /// Disagreement between the two sensors.
    #[must_use]
    pub fn gap(&self) -> f64 {
        self.secondary_diff.abs()
    }
}

/// Channel wiring and sign convention of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedundantAxis {
    pub axis: Axis,
    /// ADC input of the primary sensor.
    pub primary: u8,
    /// ADC input of the secondary sensor.
    pub secondary: u8,
    /// DAC outputs, both driven with the same value.
    pub outputs: [DacChannel; 2],
    /// Percent sign is flipped relative to raw units.
    pub inverted: bool,
}

impl RedundantAxis {
    /// Forward/back: P0 and P1 in, A and B out.
    #[must_use]
    pub const fn forward_back() -> Self {
        Self {
            axis: Axis::ForwardBack,
            primary: 0,
            secondary: 1,
            outputs: [DacChannel::A, DacChannel::B],
            inverted: false,
        }
    }

    /// Left/right: P2 and P3 in, C and D out.
    ///
    /// Inverted so that a positive percentage turns left, like a positive
    /// angular velocity.
    #[must_use]
    pub const fn left_right() -> Self {
        Self {
            axis: Axis::LeftRight,
            primary: 2,
            secondary: 3,
            outputs: [DacChannel::C, DacChannel::D],
            inverted: true,
        }
    }

    /// Read the primary sensor and the primary/secondary difference.
    pub fn read<A: AnalogChannelReader + ?Sized>(&self, adc: &mut A) -> Result<RawSample> {
        let primary = adc.read(AnalogInput::Single(self.primary))?;
        let diff = adc.read(AnalogInput::Differential(self.primary, self.secondary))?;
        Ok(RawSample {
            primary: f64::from(primary) / ADC_BIT_DIVISOR,
            secondary_diff: f64::from(diff) / ADC_BIT_DIVISOR,
        })
    }

    /// Convert a fused measurement to a percentage, clamped to -100..=100.
    #[must_use]
    pub fn to_percent(&self, measurement: f64, calibration: AxisCalibration) -> f64 {
        let percent = (measurement - f64::from(calibration.center)) / FULL_DEFLECTION * PERCENT_MAX;
        let percent = if self.inverted { -percent } else { percent };
        percent.clamp(PERCENT_MIN, PERCENT_MAX)
    }

    /// Convert a percentage to the 16-bit DAC word for both outputs.
    ///
    /// Saturates at the ends of the DAC range.
    #[must_use]
    pub fn to_dac(&self, percent: f64, calibration: AxisCalibration) -> u16 {
        let percent = if self.inverted { -percent } else { percent };
        let raw = percent / PERCENT_MAX * FULL_DEFLECTION + f64::from(calibration.center);
        let word = DAC_BIT_MULTIPLIER * raw * DAC_OUTPUT_GAIN;
        word.round().clamp(0.0, f64::from(u16::MAX)) as u16
    }
}
