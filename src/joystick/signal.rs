//! # Joystick Signal
//!
//! Single owner of the virtual joystick's physical state.
//!
//! [`JoystickSignal`] reads the redundant sensors, reports the position as
//! percentages, drives the DAC from percentages, and enforces the
//! fail-safe lockout when the two sensors of an axis disagree.
//!
//! ## Deviation Lockout
//!
//! When either axis reports a sensor gap at or above the deviation
//! threshold, all four DAC outputs are forced to [`LOCKOUT_FRAME`] and the
//! fault is latched. While latched, [`JoystickSignal::set_percent`] keeps
//! re-asserting the lockout instead of applying the command. The latch
//! clears on the first read with both gaps below the threshold; the next
//! command then applies normally.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::axis::{JoystickCalibration, RawSample, RedundantAxis};
use super::{is_valid_percent, Axis, PercentCommand, DEFAULT_DEVIATION_THRESHOLD, LOCKOUT_FRAME};
use crate::error::{JoystickError, Result};
use crate::hardware::{AnalogChannelReader, DacChannelWriter, DacFrame};

/// The virtual joystick.
///
/// All operations take `&self`; the ADC, the DAC and the calibration each
/// sit behind their own lock, so one instance can be shared through an
/// `Arc` between the command path, telemetry and the watchdog. Every
/// four-channel DAC write happens under the DAC lock.
pub struct JoystickSignal<A, D> {
    adc: Mutex<A>,
    dac: Mutex<D>,
    forward_back: RedundantAxis,
    left_right: RedundantAxis,
    calibration: RwLock<JoystickCalibration>,
    deviation_threshold: f64,
    faulted: AtomicBool,
}

impl<A, D> std::fmt::Debug for JoystickSignal<A, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoystickSignal")
            .field("calibration", &*self.calibration.read())
            .field("deviation_threshold", &self.deviation_threshold)
            .field("faulted", &self.faulted.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<A: AnalogChannelReader, D: DacChannelWriter> JoystickSignal<A, D> {
    /// Create a joystick with the default deviation threshold and the
    /// reference calibration.
    ///
    /// Nothing is written to the DAC until the first command or stop.
    pub fn new(adc: A, dac: D) -> Self {
        Self::with_deviation_threshold(adc, dac, DEFAULT_DEVIATION_THRESHOLD)
    }

    /// Create a joystick that faults at `deviation_threshold` raw units of
    /// sensor disagreement.
    pub fn with_deviation_threshold(adc: A, dac: D, deviation_threshold: f64) -> Self {
        Self {
            adc: Mutex::new(adc),
            dac: Mutex::new(dac),
            forward_back: RedundantAxis::forward_back(),
            left_right: RedundantAxis::left_right(),
            calibration: RwLock::new(JoystickCalibration::default()),
            deviation_threshold,
            faulted: AtomicBool::new(false),
        }
    }

    fn axis(&self, axis: Axis) -> &RedundantAxis {
        match axis {
            Axis::ForwardBack => &self.forward_back,
            Axis::LeftRight => &self.left_right,
        }
    }

    /// Read both sensors of `axis`. Performs no fault checking.
    pub fn read_axis_pair(&self, axis: Axis) -> Result<RawSample> {
        let mut adc = self.adc.lock();
        self.axis(axis).read(&mut *adc)
    }

    /// Current joystick position as percentages.
    ///
    /// Locks out the DAC if either axis's sensors disagree by the deviation
    /// threshold or more. The computed position is returned either way.
    /// A failed lockout write is logged; the fault stays latched, so the
    /// next command writes the lockout again.
    ///
    /// # Errors
    ///
    /// Returns error if the ADC cannot be read.
    pub fn get_percent(&self) -> Result<PercentCommand> {
        let fb = self.read_axis_pair(Axis::ForwardBack)?;
        let lr = self.read_axis_pair(Axis::LeftRight)?;
        let calibration = *self.calibration.read();

        let percent = PercentCommand {
            forward_back: self.forward_back.to_percent(fb.value(), calibration.forward_back),
            left_right: self.left_right.to_percent(lr.value(), calibration.left_right),
        };

        if fb.gap() >= self.deviation_threshold || lr.gap() >= self.deviation_threshold {
            if !self.faulted.swap(true, Ordering::SeqCst) {
                warn!(
                    "Sensor deviation (forward/back {:.1}, left/right {:.1}, threshold {}), locking out joystick",
                    fb.gap(),
                    lr.gap(),
                    self.deviation_threshold
                );
            }
            if let Err(e) = self.lockout() {
                error!("Failed to write lockout output: {}", e);
            }
        } else if self.faulted.swap(false, Ordering::SeqCst) {
            info!("Sensor deviation cleared, next command will be applied");
        }

        Ok(percent)
    }

    /// Drive the joystick to a position.
    ///
    /// `left_right` is positive to the left. Both outputs of each axis get
    /// the same value, and all four channels are written in one critical
    /// section. Returns the frame that was written.
    ///
    /// # Errors
    ///
    /// - [`JoystickError::OutOfRange`] if either value is outside -100..=100;
    ///   the DAC is left untouched.
    /// - I2C errors from the DAC write.
    pub fn set_percent(&self, forward_back: f64, left_right: f64) -> Result<DacFrame> {
        for (axis, value) in [(Axis::ForwardBack, forward_back), (Axis::LeftRight, left_right)] {
            if !is_valid_percent(value) {
                return Err(JoystickError::OutOfRange { axis, value });
            }
        }

        let calibration = *self.calibration.read();
        let fb = self.forward_back.to_dac(forward_back, calibration.forward_back);
        let lr = self.left_right.to_dac(left_right, calibration.left_right);

        let mut frame: DacFrame = [0; 4];
        for channel in self.forward_back.outputs {
            frame[channel.index()] = fb;
        }
        for channel in self.left_right.outputs {
            frame[channel.index()] = lr;
        }

        let mut dac = self.dac.lock();
        if self.faulted.load(Ordering::SeqCst) {
            debug!("Joystick locked out, holding fail-safe output");
            dac.write_all(LOCKOUT_FRAME)?;
            return Ok(LOCKOUT_FRAME);
        }
        dac.write_all(frame)?;
        debug!("Joystick set to fb {:.1}% lr {:.1}% ({:?})", forward_back, left_right, frame);
        Ok(frame)
    }

    /// Center the joystick. Safe to call repeatedly.
    pub fn stop(&self) -> Result<DacFrame> {
        self.set_percent(0.0, 0.0)
    }

    fn lockout(&self) -> Result<()> {
        self.dac.lock().write_all(LOCKOUT_FRAME)
    }

    /// Replace both axis centers.
    pub fn set_calibration(&self, forward_back_center: i32, left_right_center: i32) {
        *self.calibration.write() = JoystickCalibration::new(forward_back_center, left_right_center);
        info!(
            "Calibration set: forward/back center {}, left/right center {}",
            forward_back_center, left_right_center
        );
    }

    /// Current axis centers.
    pub fn calibration(&self) -> JoystickCalibration {
        *self.calibration.read()
    }

    /// Whether a sensor deviation lockout is in effect.
    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::SeqCst)
    }

    pub fn deviation_threshold(&self) -> f64 {
        self.deviation_threshold
    }
}
