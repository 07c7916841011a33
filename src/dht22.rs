//! DHT22 humidity/temperature sensor on a single shared data line.
//!
//! The handshake is bit-banged: the line flips between output and input
//! around the start pulse, and bit values come from the width of the high
//! pulses, measured with the microsecond timer.

use crate::pin::{PinMode, SensorLine};
use crate::timer::MicroTimer;

// Protocol timings, all in microseconds.
const START_LOW_US: u16 = 1_200;
const START_RELEASE_US: u16 = 30;
const HANDSHAKE_TIMEOUT_US: u16 = 100;
const BIT_TIMEOUT_US: u16 = 120;
/// A high pulse longer than this is a one (~70 us) rather than a zero
/// (~27 us).
const ONE_THRESHOLD_US: u16 = 50;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error {
    /// The line never reached the expected level in time.
    Timeout,
    /// A full frame arrived but its checksum did not match.
    Checksum,
}

/// One decoded measurement, in tenths of a unit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Reading {
    pub humidity_x10: u16,
    pub temp_x10: i16,
}

impl Reading {
    pub fn fahrenheit_x10(&self) -> i16 {
        self.temp_x10 * 9 / 5 + 320
    }
}

pub struct Dht22 {
    line: SensorLine,
}

impl Dht22 {
    pub fn new(line: SensorLine) -> Self {
        Dht22 { line }
    }

    /// Runs one full handshake. The sensor ignores start pulses arriving
    /// less than two seconds after the previous read.
    pub fn read(&mut self, timer: &mut MicroTimer) -> Result<Reading, Error> {
        // Start pulse: hold the line low, release, then listen.
        self.line.set_mode(PinMode::Output);
        self.line.set_low();
        timer.delay_us(START_LOW_US);
        self.line.set_high();
        timer.delay_us(START_RELEASE_US);
        self.line.set_mode(PinMode::Input);

        // The sensor answers with ~80 us low, ~80 us high, then the first
        // bit's low preamble begins.
        self.wait_for(false, HANDSHAKE_TIMEOUT_US, timer)?;
        self.wait_for(true, HANDSHAKE_TIMEOUT_US, timer)?;
        self.wait_for(false, HANDSHAKE_TIMEOUT_US, timer)?;

        let mut frame = [0u8; 5];
        for bit in 0..40usize {
            // ~50 us low preamble, then the width of the high pulse
            // encodes the bit.
            self.wait_for(true, BIT_TIMEOUT_US, timer)?;
            let width = self.wait_for(false, BIT_TIMEOUT_US, timer)?;
            if width > ONE_THRESHOLD_US {
                frame[bit / 8] |= 0x80u8 >> (bit % 8);
            }
        }
        decode(&frame)
    }

    /// Busy-waits until the line reads `level`, returning how long that
    /// took.
    fn wait_for(
        &mut self,
        level: bool,
        timeout: u16,
        timer: &mut MicroTimer,
    ) -> Result<u16, Error> {
        timer.restart();
        loop {
            let elapsed = timer.elapsed_us();
            if self.line.is_high() == level {
                return Ok(elapsed);
            }
            if elapsed > timeout {
                return Err(Error::Timeout);
            }
        }
    }
}

/// Checks the frame checksum and splits out the scaled fields.
fn decode(frame: &[u8; 5]) -> Result<Reading, Error> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(Error::Checksum);
    }
    let humidity_x10 = u16::from_be_bytes([frame[0], frame[1]]);
    let raw_temp = u16::from_be_bytes([frame[2], frame[3]]);
    // The temperature sign lives in bit 15; the field is not two's
    // complement.
    let temp_x10 = if raw_temp & 0x8000 != 0 {
        -((raw_temp & 0x7FFF) as i16)
    } else {
        raw_temp as i16
    };
    Ok(Reading {
        humidity_x10,
        temp_x10,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_the_datasheet_frame() {
        // 65.2 %RH, 35.1 C.
        let reading = decode(&[0x02, 0x8C, 0x01, 0x5F, 0xEE]).unwrap();
        assert_eq!(reading.humidity_x10, 652);
        assert_eq!(reading.temp_x10, 351);
    }

    #[test]
    fn bit_15_flips_the_temperature_sign() {
        // 50.0 %RH, -10.1 C.
        let reading = decode(&[0x01, 0xF4, 0x80, 0x65, 0xDA]).unwrap();
        assert_eq!(reading.humidity_x10, 500);
        assert_eq!(reading.temp_x10, -101);
    }

    #[test]
    fn rejects_a_bad_checksum() {
        assert_eq!(decode(&[0x02, 0x8C, 0x01, 0x5F, 0xEF]), Err(Error::Checksum));
    }

    #[test]
    fn converts_to_fahrenheit_tenths() {
        let reading = Reading {
            humidity_x10: 0,
            temp_x10: 271,
        };
        assert_eq!(reading.fahrenheit_x10(), 807);
        let freezing = Reading {
            humidity_x10: 0,
            temp_x10: 0,
        };
        assert_eq!(freezing.fahrenheit_x10(), 320);
    }
}
