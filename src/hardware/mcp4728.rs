//! # MCP4728 Digital-to-Analog Converter
//!
//! 12-bit, 4-channel DAC that drives the virtual joystick outputs.
//!
//! Values are accepted on a 16-bit scale and reduced to the chip's
//! 12 bits. Single-channel writes use the multi-write command with the
//! VDD reference, gain 1 and normal power mode. Four-channel writes use
//! one fast-write transaction so every output changes together.

use embedded_hal::i2c::I2c;
use tracing::trace;

use super::i2c::bus_error;
use super::{DacChannel, DacChannelWriter, DacFrame, DAC_NUM_CHANNELS};
use crate::error::Result;

/// Default 7-bit address
pub const MCP4728_DEFAULT_ADDRESS: u8 = 0x60;

/// Multi-write command (`0 1 0 0 0 DAC1 DAC0 UDAC`)
pub const CMD_MULTI_WRITE: u8 = 0x40;

/// Fast-write frame length (2 bytes per channel)
pub const FAST_WRITE_LEN: usize = 2 * DAC_NUM_CHANNELS;

/// Reduce a 16-bit value to the 12-bit DAC code.
#[inline]
#[must_use]
pub fn dac_code(value: u16) -> u16 {
    value >> 4
}

/// Encode a multi-write of one channel.
///
/// UDAC is left clear so the output updates as soon as the write ends.
#[must_use]
pub fn encode_multi_write(channel: DacChannel, value: u16) -> [u8; 3] {
    let code = dac_code(value);
    // VREF=0 (VDD), PD=00, GAIN=0
    [
        CMD_MULTI_WRITE | ((channel.index() as u8) << 1),
        ((code >> 8) & 0x0F) as u8,
        (code & 0xFF) as u8,
    ]
}

/// Encode a fast write of all four channels.
#[must_use]
pub fn encode_fast_write(values: &DacFrame) -> [u8; FAST_WRITE_LEN] {
    let mut frame = [0u8; FAST_WRITE_LEN];
    for (i, &value) in values.iter().enumerate() {
        let code = dac_code(value);
        // C2 C1 (00 = fast write) PD1 PD0 (00 = normal) D11..D8
        frame[2 * i] = ((code >> 8) & 0x0F) as u8;
        frame[2 * i + 1] = (code & 0xFF) as u8;
    }
    frame
}

/// MCP4728 on an I2C bus.
#[derive(Debug)]
pub struct Mcp4728<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Mcp4728<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.i2c
            .write(self.address, bytes)
            .map_err(|e| bus_error("MCP4728", self.address, e))
    }
}

impl<I2C: I2c + Send> DacChannelWriter for Mcp4728<I2C> {
    fn write(&mut self, channel: DacChannel, value: u16) -> Result<()> {
        trace!("MCP4728 {:?} = {}", channel, value);
        self.send(&encode_multi_write(channel, value))
    }

    fn write_all(&mut self, values: DacFrame) -> Result<()> {
        trace!("MCP4728 frame {:?}", values);
        self.send(&encode_fast_write(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JoystickError;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDR: u8 = MCP4728_DEFAULT_ADDRESS;

    #[test]
    fn test_dac_code_drops_low_nibble() {
        assert_eq!(dac_code(65535), 4095);
        assert_eq!(dac_code(0), 0);
        assert_eq!(dac_code(0x7890), 0x789);
    }

    #[test]
    fn test_encode_multi_write_channel_select() {
        assert_eq!(encode_multi_write(DacChannel::A, 65535), [0x40, 0x0F, 0xFF]);
        assert_eq!(encode_multi_write(DacChannel::B, 0), [0x42, 0x00, 0x00]);
        assert_eq!(encode_multi_write(DacChannel::C, 0x1230), [0x44, 0x01, 0x23]);
        assert_eq!(encode_multi_write(DacChannel::D, 0x8000), [0x46, 0x08, 0x00]);
    }

    #[test]
    fn test_encode_fast_write_lockout_pattern() {
        let frame = encode_fast_write(&[65535, 0, 0, 65535]);
        assert_eq!(frame, [0x0F, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x0F, 0xFF]);
    }

    #[test]
    fn test_write_all_is_one_transaction() {
        // 39456 >> 4 = 0x9A2, 39424 >> 4 = 0x9A0
        let mut i2c = I2cMock::new(&[I2cTransaction::write(
            ADDR,
            vec![0x09, 0xA2, 0x09, 0xA2, 0x09, 0xA0, 0x09, 0xA0],
        )]);
        let mut dac = Mcp4728::new(i2c.clone(), ADDR);

        dac.write_all([39456, 39456, 39424, 39424]).unwrap();
        i2c.done();
    }

    #[test]
    fn test_single_channel_write() {
        let mut i2c = I2cMock::new(&[I2cTransaction::write(ADDR, vec![0x44, 0x0F, 0xFF])]);
        let mut dac = Mcp4728::new(i2c.clone(), ADDR);

        dac.write(DacChannel::C, 0xFFFF).unwrap();
        i2c.done();
    }

    #[test]
    fn test_write_all_bus_error_is_reported() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, encode_fast_write(&[0; 4]).to_vec()).with_error(ErrorKind::Other),
        ]);
        let mut dac = Mcp4728::new(i2c.clone(), ADDR);

        match dac.write_all([0; 4]) {
            Err(JoystickError::I2c(msg)) => assert!(msg.contains("MCP4728 at 0x60")),
            other => panic!("Expected I2c error, got: {:?}", other),
        }
        i2c.done();
    }
}
