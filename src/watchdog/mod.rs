//! # Watchdog Module
//!
//! Stops the wheelchair when commands stop arriving.
//!
//! The watchdog runs on its own timer, independent of the command path.
//! Every firing is a complete check: if the last command is older than the
//! timeout, or no command has arrived yet, the joystick is centered. The
//! stop is repeated on every firing for as long as commands stay stale;
//! centering an already centered joystick changes nothing.
//!
//! The watchdog also times itself. If one check takes longer than the
//! timeout, the timing guarantee is already broken, so the next firing
//! stops the joystick and returns [`JoystickError::WatchdogOverrun`],
//! which ends the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::command::LastCommandTime;
use crate::error::{JoystickError, Result};
use crate::hardware::{AnalogChannelReader, DacChannelWriter};
use crate::joystick::JoystickSignal;

/// Default time without a command before the joystick is centered.
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(2);

/// Default check period (1/20 of the default timeout).
pub const DEFAULT_WATCHDOG_PERIOD: Duration = Duration::from_millis(100);

/// Outcome of one watchdog check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// A command arrived within the timeout.
    Fresh,
    /// The last command is older than the timeout.
    Stale,
    /// No command has arrived yet.
    NoCommand,
}

impl WatchdogVerdict {
    /// Whether this verdict centers the joystick.
    #[must_use]
    pub fn stops(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

/// Periodic stale-command check.
pub struct Watchdog<A, D> {
    joystick: Arc<JoystickSignal<A, D>>,
    last_command: Arc<LastCommandTime>,
    timeout: Duration,
    period: Duration,
    last_check_duration: Option<Duration>,
}

impl<A, D> std::fmt::Debug for Watchdog<A, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("timeout", &self.timeout)
            .field("period", &self.period)
            .field("last_check_duration", &self.last_check_duration)
            .finish_non_exhaustive()
    }
}

impl<A: AnalogChannelReader, D: DacChannelWriter> Watchdog<A, D> {
    /// Watchdog with the default 2 s timeout and 100 ms period.
    pub fn new(joystick: Arc<JoystickSignal<A, D>>, last_command: Arc<LastCommandTime>) -> Self {
        Self::with_timing(
            joystick,
            last_command,
            DEFAULT_WATCHDOG_TIMEOUT,
            DEFAULT_WATCHDOG_PERIOD,
        )
    }

    pub fn with_timing(
        joystick: Arc<JoystickSignal<A, D>>,
        last_command: Arc<LastCommandTime>,
        timeout: Duration,
        period: Duration,
    ) -> Self {
        Self {
            joystick,
            last_command,
            timeout,
            period,
            last_check_duration: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// How long the previous check took.
    pub fn last_check_duration(&self) -> Option<Duration> {
        self.last_check_duration
    }

    /// Run one check.
    ///
    /// # Errors
    ///
    /// - [`JoystickError::WatchdogOverrun`] if the previous check took longer
    ///   than the timeout. The joystick is stopped first.
    /// - I2C errors from the stop.
    pub fn check(&mut self) -> Result<WatchdogVerdict> {
        if let Some(elapsed) = self.last_check_duration {
            if elapsed > self.timeout {
                if let Err(e) = self.joystick.stop() {
                    error!("Failed to stop joystick after watchdog overrun: {}", e);
                }
                return Err(JoystickError::WatchdogOverrun {
                    elapsed,
                    timeout: self.timeout,
                });
            }
        }

        let started = Instant::now();
        let result = self.check_last_command(started);
        self.last_check_duration = Some(started.elapsed());
        result
    }

    fn check_last_command(&self, now: Instant) -> Result<WatchdogVerdict> {
        // Held across the stop so a command cannot land between the
        // staleness decision and the write.
        let last = self.last_command.lock();
        let verdict = match *last {
            None => WatchdogVerdict::NoCommand,
            Some(at) if now.saturating_duration_since(at) > self.timeout => WatchdogVerdict::Stale,
            Some(_) => WatchdogVerdict::Fresh,
        };

        if verdict.stops() {
            self.joystick.stop()?;
        }
        Ok(verdict)
    }

    /// Run checks every period until `shutdown` turns true or is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`JoystickError::WatchdogOverrun`] when a check overruns.
    /// Hardware errors are logged and the next firing tries again.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Watchdog running: timeout {:?}, period {:?}",
            self.timeout, self.period
        );

        let mut previous = WatchdogVerdict::NoCommand;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.check() {
                        Ok(verdict) => {
                            if verdict == WatchdogVerdict::Stale && previous == WatchdogVerdict::Fresh {
                                warn!("No command for over {:?}, stopping", self.timeout);
                            }
                            previous = verdict;
                        }
                        Err(e @ JoystickError::WatchdogOverrun { .. }) => {
                            error!("{}", e);
                            return Err(e);
                        }
                        Err(e) => warn!("Watchdog stop failed: {}", e),
                    }
                }

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Watchdog shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }
}
