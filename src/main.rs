#![no_std]
#![no_main]

// used to provide panic_implementation
#[allow(unused)]
use panic_abort;

use core::fmt::Write;

use cortex_m_rt::{entry, exception, ExceptionFrame};
use hal::interrupt;
use heapless::String;

use humistat::board::{self, Board};
use humistat::buttons::{self, Button};
use humistat::dht22;
use humistat::println;

const LCD_COLS: usize = 16;

struct Ui {
    powered: bool,
    backlight: bool,
    fahrenheit: bool,
}

#[entry]
fn main() -> ! {
    let dp = hal::stm32::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut board = match board::bring_up(dp, cp) {
        Ok(board) => board,
        Err(_) => board::fatal(),
    };
    println!("humistat ready");

    let mut ui = Ui {
        powered: true,
        backlight: true,
        fahrenheit: false,
    };
    let mut last: Option<dht22::Reading> = None;

    loop {
        if board::take_tick() && ui.powered {
            match board.sensor.read(&mut board.micro) {
                Ok(reading) => {
                    last = Some(reading);
                    show(&mut board, reading, ui.fahrenheit);
                    let t = reading.temp_x10.unsigned_abs();
                    println!(
                        "rh {}.{} % | t {}{}.{} C",
                        reading.humidity_x10 / 10,
                        reading.humidity_x10 % 10,
                        if reading.temp_x10 < 0 { "-" } else { "" },
                        t / 10,
                        t % 10
                    );
                }
                Err(e) => println!("sensor read failed: {:?}", e),
            }
        }
        if buttons::take(Button::Power) {
            ui.powered = !ui.powered;
            if board.display.display(ui.powered, &mut board.micro).is_err() {
                println!("display power toggle failed");
            }
            println!("power {}", if ui.powered { "on" } else { "off" });
        }
        if buttons::take(Button::Light) {
            ui.backlight = !ui.backlight;
            if board.display.set_backlight(ui.backlight).is_err() {
                println!("backlight toggle failed");
            }
        }
        if buttons::take(Button::Select) {
            ui.fahrenheit = !ui.fahrenheit;
            if let Some(reading) = last {
                show(&mut board, reading, ui.fahrenheit);
            }
        }
        cortex_m::asm::wfi();
    }
}

/// Renders a reading onto the two LCD rows, padding out stale characters.
fn show(board: &mut Board, reading: dht22::Reading, fahrenheit: bool) {
    let (temp, unit) = if fahrenheit {
        (reading.fahrenheit_x10(), 'F')
    } else {
        (reading.temp_x10, 'C')
    };
    let sign = if temp < 0 { "-" } else { "" };
    let t = temp.unsigned_abs();

    let mut top: String<LCD_COLS> = String::new();
    let mut bottom: String<LCD_COLS> = String::new();
    write!(top, "{}{}.{} {}", sign, t / 10, t % 10, unit).ok();
    write!(
        bottom,
        "{}.{} %RH",
        reading.humidity_x10 / 10,
        reading.humidity_x10 % 10
    )
    .ok();
    while top.push(' ').is_ok() {}
    while bottom.push(' ').is_ok() {}

    let drawn = board
        .display
        .set_cursor(0, 0, &mut board.micro)
        .and_then(|_| board.display.print(&top, &mut board.micro))
        .and_then(|_| board.display.set_cursor(1, 0, &mut board.micro))
        .and_then(|_| board.display.print(&bottom, &mut board.micro));
    if drawn.is_err() {
        println!("display write failed");
    }
}

#[interrupt]
fn EXTI0_1() {
    board::service_button(Button::Power);
}

#[interrupt]
fn EXTI2_3() {
    board::service_button(Button::Light);
}

#[interrupt]
fn EXTI4_15() {
    board::service_button(Button::Select);
}

#[interrupt]
fn TIM14() {
    board::service_tick();
}

#[exception]
unsafe fn HardFault(ef: &ExceptionFrame) -> ! {
    panic!("HardFault at {:#?}", ef);
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    panic!("Unhandled exception (IRQn = {})", irqn);
}
