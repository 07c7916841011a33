//! Board bring-up: one fixed sequence at boot, fatal halt on any failure.
//!
//! Order matters and is not reorderable: the microsecond timer comes up
//! before anything that delays, and the tick timer is armed last.

use core::sync::atomic::{AtomicBool, Ordering};

use cortex_m::peripheral::NVIC;
use hal::exti::{Event, ExtiExt};
use hal::gpio::gpiob::{PB8, PB9};
use hal::gpio::{OpenDrain, Output, SignalEdge};
use hal::i2c::{self, I2c};
use hal::prelude::*;
use hal::rcc::{Config, Prescaler};
use hal::serial::FullConfig;
use hal::stm32::{self, Interrupt};

use crate::buttons::{self, Button};
use crate::dht22::Dht22;
use crate::lcd::{self, Lcd};
use crate::logger;
use crate::pin::SensorLine;
use crate::timer::{MicroTimer, Ticker};

/// I2C1 with the display backpack on PB8 (SCL) / PB9 (SDA).
pub type DisplayBus = I2c<stm32::I2C1, PB9<Output<OpenDrain>>, PB8<Output<OpenDrain>>>;

/// Raw I2C timing register value: 100 kHz from the 48 MHz core clock.
pub const I2C_TIMING: u32 = 0x1080_5D88;

// Interrupt priority levels. The ordering power < light < select < tick
// encodes which event wins when several fire at once.
pub const POWER_PRIO: u8 = 0;
pub const LIGHT_PRIO: u8 = 1;
pub const SELECT_PRIO: u8 = 2;
pub const TICK_PRIO: u8 = 3;

/// The M0+ implements two priority bits, in the top of the byte.
const PRIO_BITS: u8 = 2;

const fn hw_prio(level: u8) -> u8 {
    level << (8 - PRIO_BITS)
}

/// Which bring-up step failed. Reported nowhere -- every variant ends in
/// `fatal` -- but it keeps the sequence readable as a `?` chain.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Fault {
    Serial,
    Display,
}

/// Everything the monitor loop owns after bring-up.
pub struct Board {
    pub micro: MicroTimer,
    pub sensor: Dht22,
    pub display: Lcd<DisplayBus>,
}

// Parked for the interrupt handlers at the moment their lines are armed.
static mut EXTI: Option<stm32::EXTI> = None;
static mut TICKER: Option<Ticker> = None;
static TICK: AtomicBool = AtomicBool::new(false);

/// Interrupts off, spin forever. A misconfigured peripheral cannot be
/// trusted, so nothing is retried.
pub fn fatal() -> ! {
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::nop();
    }
}

pub fn bring_up(dp: stm32::Peripherals, mut cp: cortex_m::Peripherals) -> Result<Board, Fault> {
    // HSI at 48 MHz, nothing divided; flash wait states are the HAL's
    // concern.
    let mut rcc = dp.RCC.freeze(Config::hsi(Prescaler::NotDivided));
    let mut exti = dp.EXTI;

    let gpioa = dp.GPIOA.split(&mut rcc);
    let gpiob = dp.GPIOB.split(&mut rcc);
    let gpioc = dp.GPIOC.split(&mut rcc);

    // The sensor line idles as an input until a read begins.
    let sensor_line = SensorLine::new(gpioa.pa7.into_floating_input());

    // Buttons: rising edge, pulled down, one EXTI vector each.
    let mut power = gpioa.pa0.into_pull_down_input();
    power.listen(SignalEdge::Rising, &mut exti);
    let mut light = gpiob.pb3.into_pull_down_input();
    light.listen(SignalEdge::Rising, &mut exti);
    let mut select = gpioc.pc13.into_pull_down_input();
    select.listen(SignalEdge::Rising, &mut exti);

    // The handlers may run as soon as their lines are unmasked; park the
    // EXTI block for them first.
    unsafe {
        EXTI = Some(exti);
        cp.NVIC.set_priority(Interrupt::EXTI0_1, hw_prio(POWER_PRIO));
        cp.NVIC.set_priority(Interrupt::EXTI2_3, hw_prio(LIGHT_PRIO));
        cp.NVIC.set_priority(Interrupt::EXTI4_15, hw_prio(SELECT_PRIO));
        NVIC::unmask(Interrupt::EXTI0_1);
        NVIC::unmask(Interrupt::EXTI2_3);
        NVIC::unmask(Interrupt::EXTI4_15);
    }

    // Free-running microsecond counter; everything below may delay.
    let mut micro = MicroTimer::new(dp.TIM3);

    // Log over the ST-LINK virtual com port. 9600 baud, default frame:
    // 8 data bits, no parity, 1 stop bit, no flow control.
    let serial = dp
        .USART2
        .usart(
            gpioa.pa2,
            gpioa.pa3,
            FullConfig::default().baudrate(9600.bps()),
            &mut rcc,
        )
        .map_err(|_| Fault::Serial)?;
    let (tx, _rx) = serial.split();
    logger::set_stdout(tx);
    crate::println!("clock, gpio, timer, serial up");

    // Display bus.
    let sda = gpiob.pb9.into_open_drain_output();
    let scl = gpiob.pb8.into_open_drain_output();
    let bus = dp
        .I2C1
        .i2c(sda, scl, i2c::Config::with_timing(I2C_TIMING), &mut rcc);

    // Periodic tick, armed last.
    let ticker = Ticker::new(dp.TIM14);
    unsafe {
        TICKER = Some(ticker);
        cp.NVIC.set_priority(Interrupt::TIM14, hw_prio(TICK_PRIO));
        NVIC::unmask(Interrupt::TIM14);
    }

    let mut display = Lcd::new(bus, lcd::DEFAULT_ADDR);
    display.init(&mut micro).map_err(|_| Fault::Display)?;
    crate::println!("display up");

    Ok(Board {
        micro,
        sensor: Dht22::new(sensor_line),
        display,
    })
}

/// EXTI handler body: clears the line and latches the press.
pub fn service_button(button: Button) {
    let exti = unsafe { extract(&mut EXTI) };
    let event = match button {
        Button::Power => Event::GPIO0,
        Button::Light => Event::GPIO3,
        Button::Select => Event::GPIO13,
    };
    exti.unpend(event);
    buttons::mark_pressed(button);
}

/// TIM14 handler body.
pub fn service_tick() {
    let ticker = unsafe { extract(&mut TICKER) };
    ticker.clear_pending();
    TICK.store(true, Ordering::Relaxed);
}

/// Drains the tick latch.
pub fn take_tick() -> bool {
    let ticked = TICK.load(Ordering::Relaxed);
    if ticked {
        TICK.store(false, Ordering::Relaxed);
    }
    ticked
}

unsafe fn extract<T>(opt: &'static mut Option<T>) -> &'static mut T {
    match opt {
        Some(ref mut x) => &mut *x,
        None => panic!("extract"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_priorities_stay_strictly_ordered() {
        assert!(POWER_PRIO < LIGHT_PRIO);
        assert!(LIGHT_PRIO < SELECT_PRIO);
        assert!(SELECT_PRIO < TICK_PRIO);
    }

    #[test]
    fn priority_levels_land_in_the_implemented_bits() {
        assert_eq!(hw_prio(0), 0x00);
        assert_eq!(hw_prio(1), 0x40);
        assert_eq!(hw_prio(2), 0x80);
        assert_eq!(hw_prio(3), 0xC0);
    }
}
