//! Two-state mode switch for the sensor data line.

use ehal::digital::v2::{InputPin, OutputPin};
use hal::gpio::gpioa::PA7;
use hal::gpio::{Floating, Input, Output, PushPull, Speed};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PinMode {
    Input,
    Output,
}

enum Line {
    Input(PA7<Input<Floating>>),
    Output(PA7<Output<PushPull>>),
}

/// The DHT22 data line: either a floating digital input or a push-pull
/// output at low slew rate, never both, never pulled.
pub struct SensorLine {
    line: Option<Line>,
}

impl SensorLine {
    pub fn new(pin: PA7<Input<Floating>>) -> Self {
        SensorLine {
            line: Some(Line::Input(pin)),
        }
    }

    /// Reconfigures the line. Idempotent.
    pub fn set_mode(&mut self, mode: PinMode) {
        let line = match (self.line.take().unwrap(), mode) {
            (Line::Input(pin), PinMode::Output) => {
                Line::Output(pin.into_push_pull_output().set_speed(Speed::Low))
            }
            (Line::Output(pin), PinMode::Input) => Line::Input(pin.into_floating_input()),
            (line, _) => line,
        };
        self.line = Some(line);
    }

    /// Drives the line low. Ignored unless in output mode.
    pub fn set_low(&mut self) {
        if let Some(Line::Output(pin)) = self.line.as_mut() {
            pin.set_low().unwrap();
        }
    }

    /// Releases the line high. Ignored unless in output mode.
    pub fn set_high(&mut self) {
        if let Some(Line::Output(pin)) = self.line.as_mut() {
            pin.set_high().unwrap();
        }
    }

    /// Samples the line. Reads false unless in input mode.
    pub fn is_high(&self) -> bool {
        match self.line.as_ref() {
            Some(Line::Input(pin)) => pin.is_high().unwrap(),
            _ => false,
        }
    }
}
