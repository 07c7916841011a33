//! The three front-panel buttons, latched from their EXTI handlers.

use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Button {
    /// On/off, the most urgent of the three.
    Power,
    /// Backlight toggle.
    Light,
    /// Display unit switch.
    Select,
}

static POWER: AtomicBool = AtomicBool::new(false);
static LIGHT: AtomicBool = AtomicBool::new(false);
static SELECT: AtomicBool = AtomicBool::new(false);

fn flag(button: Button) -> &'static AtomicBool {
    match button {
        Button::Power => &POWER,
        Button::Light => &LIGHT,
        Button::Select => &SELECT,
    }
}

/// Called from the EXTI handlers.
pub fn mark_pressed(button: Button) {
    flag(button).store(true, Ordering::Relaxed);
}

/// Drains the latch. Returns true at most once per press.
pub fn take(button: Button) -> bool {
    let f = flag(button);
    let pressed = f.load(Ordering::Relaxed);
    if pressed {
        f.store(false, Ordering::Relaxed);
    }
    pressed
}
