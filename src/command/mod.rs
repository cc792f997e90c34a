//! # Command Module
//!
//! Turns external velocity commands into joystick positions.
//!
//! This module handles:
//! - Scaling linear and angular velocity into percentages
//! - Trimming out-of-range commands to -100..=100
//! - Recording when the last command arrived, for the watchdog
//!
//! Velocity commands are trimmed rather than rejected: a planner asking for
//! more than the joystick can give gets full deflection instead of being
//! dropped. [`JoystickSignal::set_percent`] itself still rejects anything
//! outside the range.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{JoystickError, Result};
use crate::hardware::{AnalogChannelReader, DacChannelWriter};
use crate::joystick::{Axis, JoystickSignal, PercentCommand, PERCENT_MAX, PERCENT_MIN};

/// Percent of deflection per unit of velocity.
pub const DEFAULT_VELOCITY_SCALE: f64 = 10.0;

/// A velocity command from the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VelocityCommand {
    /// Forward velocity; positive is forward.
    pub linear_x: f64,
    /// Turn rate; positive is counter-clockwise (left).
    pub angular_z: f64,
}

impl VelocityCommand {
    #[must_use]
    pub fn new(linear_x: f64, angular_z: f64) -> Self {
        Self {
            linear_x,
            angular_z,
        }
    }
}

/// Arrival time of the most recent accepted command.
///
/// Shared between the command gateway, which writes it, and the watchdog,
/// which reads it. `None` until the first command arrives.
#[derive(Debug, Default)]
pub struct LastCommandTime {
    inner: Mutex<Option<Instant>>,
}

impl LastCommandTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of the last command.
    pub fn get(&self) -> Option<Instant> {
        *self.inner.lock()
    }

    /// Lock the timestamp. Holding the guard keeps commands and watchdog
    /// checks from interleaving.
    pub fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.inner.lock()
    }
}

/// Clamp a scaled velocity to the joystick range, logging any trim.
fn trim(axis: Axis, value: f64) -> f64 {
    if value > PERCENT_MAX {
        info!("Trimming {} to {}", axis, PERCENT_MAX);
        PERCENT_MAX
    } else if value < PERCENT_MIN {
        info!("Trimming {} to {}", axis, PERCENT_MIN);
        PERCENT_MIN
    } else {
        value
    }
}

/// Applies velocity commands to the joystick.
pub struct CommandGateway<A, D> {
    joystick: Arc<JoystickSignal<A, D>>,
    last_command: Arc<LastCommandTime>,
    scale: f64,
}

impl<A: AnalogChannelReader, D: DacChannelWriter> CommandGateway<A, D> {
    /// Gateway with the default velocity scale of 10.
    pub fn new(joystick: Arc<JoystickSignal<A, D>>, last_command: Arc<LastCommandTime>) -> Self {
        Self::with_scale(joystick, last_command, DEFAULT_VELOCITY_SCALE)
    }

    pub fn with_scale(
        joystick: Arc<JoystickSignal<A, D>>,
        last_command: Arc<LastCommandTime>,
        scale: f64,
    ) -> Self {
        Self {
            joystick,
            last_command,
            scale,
        }
    }

    /// Scale, trim and apply a velocity command.
    ///
    /// Returns the percentages that were applied.
    ///
    /// # Errors
    ///
    /// - [`JoystickError::OutOfRange`] for NaN or infinite velocities. The
    ///   command does not count as received.
    /// - I2C errors from the DAC write. The command still counts as
    ///   received.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use wheelchair_joystick::command::{CommandGateway, LastCommandTime, VelocityCommand};
    /// # use wheelchair_joystick::hardware::{ads1015::Ads1015, i2c::open_bus, mcp4728::Mcp4728};
    /// # use wheelchair_joystick::joystick::JoystickSignal;
    /// # let joystick = Arc::new(JoystickSignal::new(
    /// #     Ads1015::new(open_bus("/dev/i2c-1")?, 0x48),
    /// #     Mcp4728::new(open_bus("/dev/i2c-1")?, 0x60),
    /// # ));
    /// let gateway = CommandGateway::new(joystick, Arc::new(LastCommandTime::new()));
    ///
    /// // 0.5 m/s forward → 5 % forward
    /// let applied = gateway.on_command(VelocityCommand::new(0.5, 0.0))?;
    /// assert_eq!(applied.forward_back, 5.0);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn on_command(&self, command: VelocityCommand) -> Result<PercentCommand> {
        for (axis, value) in [
            (Axis::ForwardBack, command.linear_x),
            (Axis::LeftRight, command.angular_z),
        ] {
            if !value.is_finite() {
                return Err(JoystickError::OutOfRange { axis, value });
            }
        }

        // Finite inputs can still scale to infinity; trimming handles that
        let percent = PercentCommand {
            forward_back: trim(Axis::ForwardBack, command.linear_x * self.scale),
            left_right: trim(Axis::LeftRight, command.angular_z * self.scale),
        };
        debug!("X = {}, Z = {}", percent.forward_back, percent.left_right);

        let mut last = self.last_command.lock();
        *last = Some(Instant::now());
        self.joystick
            .set_percent(percent.forward_back, percent.left_right)?;
        Ok(percent)
    }

    /// Arrival time of the last accepted command.
    pub fn get_last_command_time(&self) -> Option<Instant> {
        self.last_command.get()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}
