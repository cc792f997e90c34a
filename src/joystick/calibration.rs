//! # Calibration Module
//!
//! Finds the center of each axis by averaging readings at rest.
//!
//! The joystick must be centered and untouched while this runs. Nothing
//! here can tell a resting joystick from a held one, so that is up to
//! whoever starts the calibration.
//!
//! Readings go through [`JoystickSignal::read_axis_pair`] rather than
//! [`JoystickSignal::get_percent`], so sensor disagreement during
//! calibration never triggers a lockout.

use tracing::info;

use super::axis::JoystickCalibration;
use super::signal::JoystickSignal;
use super::Axis;
use crate::error::{JoystickError, Result};
use crate::hardware::{AnalogChannelReader, DacChannelWriter};

/// Readings per axis taken by default.
pub const DEFAULT_CALIBRATION_SAMPLES: usize = 1024;

/// Averages axis readings into centers.
#[derive(Debug, Clone, Copy)]
pub struct Calibrator {
    samples: usize,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self {
            samples: DEFAULT_CALIBRATION_SAMPLES,
        }
    }
}

impl Calibrator {
    /// Creates a calibrator that averages `samples` readings per axis.
    #[must_use]
    pub fn new(samples: usize) -> Self {
        Self { samples }
    }

    #[must_use]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Measure both axis centers and apply them to `joystick`.
    ///
    /// Blocks for `samples` reads of each axis.
    ///
    /// # Errors
    ///
    /// Returns error if `samples` is zero or the ADC cannot be read.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wheelchair_joystick::hardware::ads1015::Ads1015;
    /// use wheelchair_joystick::hardware::i2c::open_bus;
    /// use wheelchair_joystick::hardware::mcp4728::Mcp4728;
    /// use wheelchair_joystick::joystick::{Calibrator, JoystickSignal};
    ///
    /// let joystick = JoystickSignal::new(
    ///     Ads1015::new(open_bus("/dev/i2c-1")?, 0x48),
    ///     Mcp4728::new(open_bus("/dev/i2c-1")?, 0x60),
    /// );
    /// let calibration = Calibrator::default().calibrate(&joystick)?;
    /// println!("forward/back center: {}", calibration.forward_back.center);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn calibrate<A, D>(&self, joystick: &JoystickSignal<A, D>) -> Result<JoystickCalibration>
    where
        A: AnalogChannelReader,
        D: DacChannelWriter,
    {
        if self.samples == 0 {
            return Err(JoystickError::Calibration(
                "at least one sample is required".to_string(),
            ));
        }

        info!("Calibrating joystick center over {} samples", self.samples);

        let mut fb_sum = 0.0;
        let mut lr_sum = 0.0;
        for _ in 0..self.samples {
            fb_sum += joystick.read_axis_pair(Axis::ForwardBack)?.value();
            lr_sum += joystick.read_axis_pair(Axis::LeftRight)?.value();
        }

        let fb_center = mean_center(fb_sum, self.samples);
        let lr_center = mean_center(lr_sum, self.samples);
        joystick.set_calibration(fb_center, lr_center);

        Ok(JoystickCalibration::new(fb_center, lr_center))
    }
}

/// Mean of `samples` readings summing to `sum`, rounded to a raw unit.
#[inline]
fn mean_center(sum: f64, samples: usize) -> i32 {
    (sum / samples as f64).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mocks::MockBoard;
    use crate::hardware::{AnalogInput, MockAnalogChannelReader, MockDacChannelWriter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_default_samples() {
        assert_eq!(Calibrator::default().samples(), 1024);
    }

    #[test]
    fn test_constant_reading_sets_exact_center() {
        let board = MockBoard::new();
        board.set_normalized_inputs([1250, 1250, 1190, 1190]);
        let joystick = JoystickSignal::new(board.clone(), board.clone());

        let cal = Calibrator::new(64).calibrate(&joystick).unwrap();

        assert_eq!(cal, JoystickCalibration::new(1250, 1190));
        assert_eq!(joystick.calibration(), cal);
        // Two reads per axis per sample
        assert_eq!(board.reads(), 64 * 4);
    }

    #[test]
    fn test_mean_rounds_to_nearest() {
        assert_eq!(mean_center(1233.4 * 4.0, 4), 1233);
        assert_eq!(mean_center(1233.6 * 4.0, 4), 1234);
        assert_eq!(mean_center(-10.6, 1), -11);
    }

    #[test]
    fn test_averages_varying_readings() {
        // Alternate forward/back primary between two values
        let toggle = Arc::new(AtomicUsize::new(0));
        let mut adc = MockAnalogChannelReader::new();
        let counter = toggle.clone();
        adc.expect_read().returning(move |input| match input {
            AnalogInput::Single(0) => {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok(if n % 2 == 0 { 1200 * 16 } else { 1210 * 16 })
            }
            AnalogInput::Single(_) => Ok(1232 * 16),
            AnalogInput::Differential(_, _) => Ok(0),
        });
        let joystick = JoystickSignal::new(adc, MockDacChannelWriter::new());

        let cal = Calibrator::new(10).calibrate(&joystick).unwrap();

        assert_eq!(cal.forward_back.center, 1205);
        assert_eq!(cal.left_right.center, 1232);
    }

    #[test]
    fn test_diverging_sensors_do_not_lock_out_during_calibration() {
        let mut dac = MockDacChannelWriter::new();
        dac.expect_write_all().never();
        let board = MockBoard::new();
        board.set_normalized_inputs([1233, 1100, 1232, 1232]);

        let joystick = JoystickSignal::new(board, dac);
        Calibrator::new(8).calibrate(&joystick).unwrap();

        assert!(!joystick.is_faulted());
    }

    #[test]
    fn test_zero_samples_rejected() {
        let board = MockBoard::new();
        let joystick = JoystickSignal::new(board.clone(), board.clone());
        let before = joystick.calibration();

        let result = Calibrator::new(0).calibrate(&joystick);

        assert!(matches!(result, Err(JoystickError::Calibration(_))));
        assert_eq!(joystick.calibration(), before);
        assert_eq!(board.reads(), 0);
    }
}
