//! Walks the 7-bit address space on I2C1 and reports which devices answer.
//! Handy when the display backpack ships with a different expander address.

#![no_std]
#![no_main]

// used to provide panic_implementation
#[allow(unused)]
use panic_abort;

use cortex_m_rt::{entry, exception, ExceptionFrame};
use ehal::blocking::i2c::Write;
use hal::prelude::*;
use hal::rcc::{Config, Prescaler};
use hal::serial::FullConfig;
use hal::stm32;
use hal::i2c;

use humistat::board::I2C_TIMING;
use humistat::logger;
use humistat::println;

#[entry]
fn main() -> ! {
    let dp = stm32::Peripherals::take().unwrap();
    let mut rcc = dp.RCC.freeze(Config::hsi(Prescaler::NotDivided));

    let gpioa = dp.GPIOA.split(&mut rcc);
    let gpiob = dp.GPIOB.split(&mut rcc);

    let serial = dp
        .USART2
        .usart(
            gpioa.pa2,
            gpioa.pa3,
            FullConfig::default().baudrate(9600.bps()),
            &mut rcc,
        )
        .unwrap();
    let (tx, _rx) = serial.split();
    logger::set_stdout(tx);

    let sda = gpiob.pb9.into_open_drain_output();
    let scl = gpiob.pb8.into_open_drain_output();
    let mut bus = dp
        .I2C1
        .i2c(sda, scl, i2c::Config::with_timing(I2C_TIMING), &mut rcc);

    println!("scanning i2c1");
    let mut found = 0u8;
    for addr in 0x08..0x78u8 {
        if bus.write(addr, &[]).is_ok() {
            println!("device at {:#04x}", addr);
            found += 1;
        }
    }
    println!("done, {} device(s)", found);

    loop {
        cortex_m::asm::wfi();
    }
}

#[exception]
unsafe fn HardFault(ef: &ExceptionFrame) -> ! {
    panic!("HardFault at {:#?}", ef);
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    panic!("Unhandled exception (IRQn = {})", irqn);
}
