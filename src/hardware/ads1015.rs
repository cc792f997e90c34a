//! # ADS1015 Analog-to-Digital Converter
//!
//! 12-bit, 4-input ADC used to sample both sensors of each joystick axis.
//!
//! Conversions run in single-shot mode at ±4.096 V full scale and
//! 1600 samples per second, with the comparator disabled. The 12-bit
//! result is left-aligned in the 16-bit conversion register, so readings
//! come back on a 16-bit scale with the low nibble clear.

use embedded_hal::i2c::I2c;
use tracing::trace;

use super::i2c::bus_error;
use super::{AnalogChannelReader, AnalogInput};
use crate::error::{JoystickError, Result};

/// Default 7-bit address (ADDR pin tied to GND)
pub const ADS1015_DEFAULT_ADDRESS: u8 = 0x48;

/// Conversion result register
pub const REG_CONVERSION: u8 = 0x00;
/// Configuration register
pub const REG_CONFIG: u8 = 0x01;

/// Start a single conversion (write) / conversion idle (read)
pub const CONFIG_OS: u16 = 0x8000;
/// PGA ±4.096 V
pub const CONFIG_PGA_4_096V: u16 = 0x0200;
/// Single-shot mode
pub const CONFIG_MODE_SINGLE: u16 = 0x0100;
/// 1600 samples per second
pub const CONFIG_DR_1600SPS: u16 = 0x0080;
/// Comparator disabled
pub const CONFIG_COMP_QUE_DISABLE: u16 = 0x0003;

const CONFIG_MUX_SHIFT: u16 = 12;

/// Status polls before a conversion is declared stuck
const MAX_CONVERSION_POLLS: usize = 100;

/// Input multiplexer bits for `input`.
///
/// # Errors
///
/// Returns error for pins above P3 and for differential pairs the chip
/// cannot measure (only P0-P1, P0-P3, P1-P3 and P2-P3 exist).
pub fn mux_bits(input: AnalogInput) -> Result<u16> {
    let mux = match input {
        AnalogInput::Differential(0, 1) => 0b000,
        AnalogInput::Differential(0, 3) => 0b001,
        AnalogInput::Differential(1, 3) => 0b010,
        AnalogInput::Differential(2, 3) => 0b011,
        AnalogInput::Single(pin @ 0..=3) => 0b100 | u16::from(pin),
        other => {
            return Err(JoystickError::I2c(format!(
                "ADS1015 cannot measure input {}",
                other
            )))
        }
    };
    Ok(mux << CONFIG_MUX_SHIFT)
}

/// Configuration word that starts a single-shot conversion of `input`.
pub fn config_word(input: AnalogInput) -> Result<u16> {
    Ok(CONFIG_OS
        | mux_bits(input)?
        | CONFIG_PGA_4_096V
        | CONFIG_MODE_SINGLE
        | CONFIG_DR_1600SPS
        | CONFIG_COMP_QUE_DISABLE)
}

/// ADS1015 on an I2C bus.
#[derive(Debug)]
pub struct Ads1015<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Ads1015<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    fn write_read(&mut self, register: u8, buffer: &mut [u8; 2]) -> Result<()> {
        self.i2c
            .write_read(self.address, &[register], buffer)
            .map_err(|e| bus_error("ADS1015", self.address, e))
    }

    fn wait_for_conversion(&mut self) -> Result<()> {
        let mut status = [0u8; 2];
        for _ in 0..MAX_CONVERSION_POLLS {
            self.write_read(REG_CONFIG, &mut status)?;
            if u16::from_be_bytes(status) & CONFIG_OS != 0 {
                return Ok(());
            }
        }
        Err(JoystickError::I2c(format!(
            "ADS1015 conversion did not complete after {} polls",
            MAX_CONVERSION_POLLS
        )))
    }
}

impl<I2C: I2c + Send> AnalogChannelReader for Ads1015<I2C> {
    fn read(&mut self, input: AnalogInput) -> Result<i16> {
        let [hi, lo] = config_word(input)?.to_be_bytes();
        self.i2c
            .write(self.address, &[REG_CONFIG, hi, lo])
            .map_err(|e| bus_error("ADS1015", self.address, e))?;
        self.wait_for_conversion()?;

        let mut result = [0u8; 2];
        self.write_read(REG_CONVERSION, &mut result)?;
        let value = i16::from_be_bytes(result);
        trace!("ADS1015 {} = {}", input, value);
        Ok(value)
    }
}
