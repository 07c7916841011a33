//! HD44780 character LCD behind a PCF8574 I2C backpack.
//!
//! The expander drives the panel in 4-bit mode: P7..P4 carry the nibble,
//! P3 the backlight, P2 enable, P1 read/write (tied low here), P0 register
//! select.

use ehal::blocking::delay::{DelayMs, DelayUs};
use ehal::blocking::i2c::Write;

/// The usual PCF8574 backpack address with all jumpers open.
pub const DEFAULT_ADDR: u8 = 0x27;

// Expander control bits.
const BACKLIGHT: u8 = 0x08;
const ENABLE: u8 = 0x04;
const REG_SELECT: u8 = 0x01;

// HD44780 command set, as far as this panel needs it.
const CLEAR: u8 = 0x01;
const ENTRY_MODE: u8 = 0x06; // increment, no display shift
const DISPLAY_ON: u8 = 0x0C;
const DISPLAY_OFF: u8 = 0x08;
const FUNCTION_SET: u8 = 0x28; // 4-bit, two lines, 5x8 font
const SET_DDRAM: u8 = 0x80;

const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

pub struct Lcd<I2C> {
    i2c: I2C,
    addr: u8,
    backlight: bool,
}

impl<I2C: Write> Lcd<I2C> {
    pub fn new(i2c: I2C, addr: u8) -> Self {
        Lcd {
            i2c,
            addr,
            backlight: true,
        }
    }

    /// The 4-bit init dance. The panel wants the long power-on wait and
    /// the repeated 0x3 before it accepts the function set.
    pub fn init<D>(&mut self, delay: &mut D) -> Result<(), I2C::Error>
    where
        D: DelayUs<u16> + DelayMs<u16>,
    {
        delay.delay_ms(50);
        for _ in 0..3 {
            self.write_nibble(0x03, false, delay)?;
            delay.delay_us(4_500);
        }
        self.write_nibble(0x02, false, delay)?;
        delay.delay_us(150);
        self.command(FUNCTION_SET, delay)?;
        self.command(DISPLAY_OFF, delay)?;
        self.clear(delay)?;
        self.command(ENTRY_MODE, delay)?;
        self.command(DISPLAY_ON, delay)
    }

    pub fn clear<D>(&mut self, delay: &mut D) -> Result<(), I2C::Error>
    where
        D: DelayUs<u16> + DelayMs<u16>,
    {
        self.command(CLEAR, delay)?;
        // Clear is the one slow instruction.
        delay.delay_us(2_000);
        Ok(())
    }

    pub fn set_cursor<D>(&mut self, row: u8, col: u8, delay: &mut D) -> Result<(), I2C::Error>
    where
        D: DelayUs<u16> + DelayMs<u16>,
    {
        let offset = ROW_OFFSETS[(row as usize) % ROW_OFFSETS.len()];
        self.command(SET_DDRAM | (offset + col), delay)
    }

    pub fn print<D>(&mut self, s: &str, delay: &mut D) -> Result<(), I2C::Error>
    where
        D: DelayUs<u16> + DelayMs<u16>,
    {
        for b in s.bytes() {
            self.write_byte(b, true, delay)?;
        }
        Ok(())
    }

    /// Switches the panel's display bit without touching its contents.
    pub fn display<D>(&mut self, on: bool, delay: &mut D) -> Result<(), I2C::Error>
    where
        D: DelayUs<u16> + DelayMs<u16>,
    {
        self.command(if on { DISPLAY_ON } else { DISPLAY_OFF }, delay)
    }

    /// Drives the backlight pin directly; no strobe involved.
    pub fn set_backlight(&mut self, on: bool) -> Result<(), I2C::Error> {
        self.backlight = on;
        self.i2c.write(self.addr, &[if on { BACKLIGHT } else { 0 }])
    }

    fn command<D>(&mut self, cmd: u8, delay: &mut D) -> Result<(), I2C::Error>
    where
        D: DelayUs<u16> + DelayMs<u16>,
    {
        self.write_byte(cmd, false, delay)
    }

    fn write_byte<D>(&mut self, byte: u8, data: bool, delay: &mut D) -> Result<(), I2C::Error>
    where
        D: DelayUs<u16> + DelayMs<u16>,
    {
        self.write_nibble(byte >> 4, data, delay)?;
        self.write_nibble(byte & 0x0F, data, delay)
    }

    /// Puts one nibble on the bus and strobes enable, holding the nibble
    /// throughout.
    fn write_nibble<D>(&mut self, nibble: u8, data: bool, delay: &mut D) -> Result<(), I2C::Error>
    where
        D: DelayUs<u16> + DelayMs<u16>,
    {
        let frame = expander_frame(nibble, data, self.backlight);
        self.i2c.write(self.addr, &[frame | ENABLE])?;
        delay.delay_us(1);
        self.i2c.write(self.addr, &[frame])?;
        delay.delay_us(50);
        Ok(())
    }
}

/// Maps a nibble plus the control flags onto the expander pins.
fn expander_frame(nibble: u8, data: bool, backlight: bool) -> u8 {
    let mut frame = (nibble & 0x0F) << 4;
    if data {
        frame |= REG_SELECT;
    }
    if backlight {
        frame |= BACKLIGHT;
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Bus {
        frames: heapless::Vec<u8, 64>,
    }

    impl Write for Bus {
        type Error = ();

        fn write(&mut self, _addr: u8, bytes: &[u8]) -> Result<(), ()> {
            for b in bytes {
                self.frames.push(*b).unwrap();
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayUs<u16> for NoDelay {
        fn delay_us(&mut self, _us: u16) {}
    }

    impl DelayMs<u16> for NoDelay {
        fn delay_ms(&mut self, _ms: u16) {}
    }

    #[test]
    fn frame_places_nibble_and_flags() {
        assert_eq!(expander_frame(0x0A, false, false), 0xA0);
        assert_eq!(expander_frame(0x0A, true, false), 0xA1);
        assert_eq!(expander_frame(0x0A, true, true), 0xA9);
    }

    #[test]
    fn bytes_go_out_as_strobed_nibble_pairs() {
        let mut lcd = Lcd::new(Bus::default(), DEFAULT_ADDR);
        lcd.write_byte(b'A', true, &mut NoDelay).unwrap();
        // High nibble with enable, held, then the low nibble likewise.
        assert_eq!(&lcd.i2c.frames[..], &[0x4D, 0x49, 0x1D, 0x19]);
    }

    #[test]
    fn second_row_lands_at_ddram_0x40() {
        let mut lcd = Lcd::new(Bus::default(), DEFAULT_ADDR);
        lcd.set_cursor(1, 2, &mut NoDelay).unwrap();
        // Command 0xC2: set DDRAM address 0x42.
        assert_eq!(&lcd.i2c.frames[..], &[0xCC, 0xC8, 0x2C, 0x28]);
    }

    #[test]
    fn init_starts_with_the_reset_nibble() {
        let mut lcd = Lcd::new(Bus::default(), DEFAULT_ADDR);
        lcd.init(&mut NoDelay).unwrap();
        // 0x3 with enable high, then released, backlight on throughout.
        assert_eq!(&lcd.i2c.frames[..2], &[0x3C, 0x38]);
    }
}
