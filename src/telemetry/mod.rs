//! # Telemetry Module
//!
//! Publishes the measured joystick position at a fixed rate.
//!
//! This module handles:
//! - Sampling [`JoystickSignal::get_percent`] on a fixed-rate loop, which
//!   also keeps the deviation lockout checked
//! - Formatting each sample as a JSON line
//!   (`{"stamp": ..., "axes": [fb, lr], "buttons": []}`)
//! - Writing to stdout or a file

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::hardware::{AnalogChannelReader, DacChannelWriter};
use crate::joystick::{JoystickSignal, PercentCommand};

/// Default publish rate in Hz
pub const DEFAULT_TELEMETRY_RATE_HZ: u32 = 10;

/// One published joystick sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoyMessage {
    pub stamp: DateTime<Utc>,
    /// `[forward_back, left_right]` in percent.
    pub axes: [f64; 2],
    /// Always empty; the virtual joystick has no buttons.
    pub buttons: Vec<i32>,
}

impl JoyMessage {
    #[must_use]
    pub fn new(stamp: DateTime<Utc>, percent: PercentCommand) -> Self {
        Self {
            stamp,
            axes: [percent.forward_back, percent.left_right],
            buttons: Vec::new(),
        }
    }
}

/// Writes [`JoyMessage`]s as JSON Lines.
pub struct TelemetryPublisher<W> {
    writer: W,
    published: u64,
}

impl<W: Write> TelemetryPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            published: 0,
        }
    }

    /// Stamp `percent` with the current time and write it.
    pub fn publish(&mut self, percent: PercentCommand) -> Result<JoyMessage> {
        let message = JoyMessage::new(Utc::now(), percent);
        serde_json::to_writer(&mut self.writer, &message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.published += 1;
        Ok(message)
    }

    /// Number of messages written so far.
    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Publish the joystick position `rate_hz` times a second until `shutdown`
/// turns true or is dropped.
///
/// This loop is what runs the deviation check, so it must run even when
/// nobody wants the messages; hand it a [`std::io::sink`] in that case.
///
/// Read and write failures are logged and the loop carries on.
pub async fn run_publisher<A, D, W>(
    joystick: Arc<JoystickSignal<A, D>>,
    mut publisher: TelemetryPublisher<W>,
    rate_hz: u32,
    mut shutdown: watch::Receiver<bool>,
) -> TelemetryPublisher<W>
where
    A: AnalogChannelReader,
    D: DacChannelWriter,
    W: Write,
{
    let period = Duration::from_secs(1) / rate_hz.max(1);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Publishing joystick telemetry at {}Hz", rate_hz);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let percent = match joystick.get_percent() {
                    Ok(percent) => percent,
                    Err(e) => {
                        warn!("Failed to read joystick: {}", e);
                        continue;
                    }
                };
                if let Err(e) = publisher.publish(percent) {
                    warn!("Failed to publish telemetry: {}", e);
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Telemetry stopped after {} messages", publisher.published());
                    return publisher;
                }
            }
        }
    }
}
