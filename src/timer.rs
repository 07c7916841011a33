//! The two hardware timers: TIM3 free-running as a microsecond counter
//! behind the blocking delays, TIM14 as the periodic tick interrupt.

use ehal::blocking::delay::{DelayMs, DelayUs};
use hal::stm32::{self, TIM14, TIM3};

/// 48 MHz / (47 + 1) = 1 MHz, one count per microsecond.
const MICRO_PSC: u32 = 47;
/// Full 16-bit range; the counter wraps after 65535 us.
const MICRO_ARR: u32 = 65_535;

/// 48 MHz / 60001 / 1601: an update interrupt roughly every two seconds,
/// which is also the minimum spacing between DHT22 reads.
const TICK_PSC: u32 = 60_000;
const TICK_ARR: u32 = 1_600;

/// TIM3 as a free-running microsecond counter.
pub struct MicroTimer {
    tim: TIM3,
}

impl MicroTimer {
    pub fn new(tim: TIM3) -> Self {
        let rcc = unsafe { &(*stm32::RCC::ptr()) };
        rcc.apbenr1.modify(|_, w| w.tim3en().set_bit());
        unsafe {
            tim.psc.write(|w| w.bits(MICRO_PSC));
            tim.arr.write(|w| w.bits(MICRO_ARR));
        }
        // Load the prescaler, then let it run.
        tim.egr.write(|w| w.ug().set_bit());
        tim.cr1.modify(|_, w| w.cen().set_bit());
        MicroTimer { tim }
    }

    /// Rewinds the counter to zero.
    pub fn restart(&mut self) {
        unsafe { self.tim.cnt.write(|w| w.bits(0)) };
    }

    /// Microseconds since the last `restart`. Wraps at 65535.
    pub fn elapsed_us(&self) -> u16 {
        self.tim.cnt.read().bits() as u16
    }

    /// Blocks until at least `us` microseconds have passed. A request of
    /// zero returns immediately. Callers must stay below the 65535 us wrap
    /// period; anything longer goes through `delay_ms`.
    pub fn delay_us(&mut self, us: u16) {
        self.restart();
        while self.elapsed_us() < us {}
    }
}

impl DelayUs<u16> for MicroTimer {
    fn delay_us(&mut self, us: u16) {
        MicroTimer::delay_us(self, us)
    }
}

impl DelayMs<u16> for MicroTimer {
    fn delay_ms(&mut self, ms: u16) {
        for _ in 0..ms {
            MicroTimer::delay_us(self, 1_000);
        }
    }
}

/// TIM14 with its update interrupt armed, ticking at the monitor cadence.
pub struct Ticker {
    tim: TIM14,
}

impl Ticker {
    /// Starts the timer and enables its update event. Routing the event
    /// through the NVIC stays with the caller.
    pub fn new(tim: TIM14) -> Self {
        let rcc = unsafe { &(*stm32::RCC::ptr()) };
        rcc.apbenr2.modify(|_, w| w.tim14en().set_bit());
        unsafe {
            tim.psc.write(|w| w.bits(TICK_PSC));
            tim.arr.write(|w| w.bits(TICK_ARR));
        }
        // The update event from loading the prescaler would pend an
        // interrupt; clear it before unmasking anything.
        tim.egr.write(|w| w.ug().set_bit());
        tim.sr.modify(|_, w| w.uif().clear_bit());
        tim.dier.modify(|_, w| w.uie().set_bit());
        tim.cr1.modify(|_, w| w.cen().set_bit());
        Ticker { tim }
    }

    /// Acknowledges the update interrupt. Called from the TIM14 handler.
    pub fn clear_pending(&mut self) {
        self.tim.sr.modify(|_, w| w.uif().clear_bit());
    }
}
