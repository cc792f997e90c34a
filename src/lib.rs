//! # Wheelchair Joystick Library
//!
//! Drive a powered wheelchair by emulating its joystick.
//!
//! The wheelchair's joystick has two redundant position sensors per axis.
//! This library reads both through an ADS1015 ADC, checks that they agree,
//! and drives the wheelchair controller through an MCP4728 DAC in place of
//! the physical stick. Velocity commands are scaled into stick deflection,
//! and a watchdog returns the stick to neutral when commands stop.

pub mod command;
pub mod config;
pub mod error;
pub mod hardware;
pub mod joystick;
pub mod telemetry;
pub mod watchdog;
