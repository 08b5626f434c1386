//! Events flowing into and out of the keyboard.
//!
//! The matrix scanner produces [`KeyboardEvent`]s, the timer produces ticks, both wrapped in
//! [`InputEvent`]. The keyboard emits an ordered stream of [`KeyEvent`]s for the HID transport.

use embassy_time::Instant;
use keystack_types::keycode::KeyCode;
use serde::{Deserialize, Serialize};

/// Physical position of a key in the matrix
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyPos {
    pub row: u8,
    pub col: u8,
}

impl KeyPos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// A debounced key state change reported by the matrix scanner
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardEvent {
    pub pos: KeyPos,
    pub pressed: bool,
    /// Time of the state change. Must be monotonic across the event stream.
    pub time: Instant,
}

impl KeyboardEvent {
    pub fn key(row: u8, col: u8, pressed: bool, time: Instant) -> Self {
        Self {
            pos: KeyPos { row, col },
            pressed,
            time,
        }
    }
}

/// Everything the keyboard consumes
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    /// A key was pressed or released
    Key(KeyboardEvent),
    /// Periodic timer tick, used to expire pending tap/hold decisions
    Tick(Instant),
}

/// Virtual key event sent to the HID transport.
/// The keycode may be a normal key or a modifier.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
}

impl KeyEvent {
    pub fn keycode(&self) -> KeyCode {
        match self {
            KeyEvent::KeyDown(k) | KeyEvent::KeyUp(k) => *k,
        }
    }

    pub fn is_down(&self) -> bool {
        matches!(self, KeyEvent::KeyDown(_))
    }
}

/// Receiver of the virtual key event stream
pub trait KeyEventSink {
    /// Append one event to the output stream
    fn send(&mut self, event: KeyEvent);
}

impl<const N: usize> KeyEventSink for heapless::Vec<KeyEvent, N> {
    fn send(&mut self, event: KeyEvent) {
        if self.push(event).is_err() {
            error!("Key event buffer is full, dropping {:?}", event);
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl KeyEventSink for std::vec::Vec<KeyEvent> {
    fn send(&mut self, event: KeyEvent) {
        self.push(event);
    }
}
