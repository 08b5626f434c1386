#![allow(dead_code)]

use embassy_time::Instant;
use keystack::config::BehaviorConfig;
use keystack::event::{KeyEvent, KeyboardEvent};
use keystack::function::{FunctionCall, FunctionHandler, FunctionOutcome};
use keystack::keyboard::Keyboard;
use keystack::keyboard_macros::{MacroDefinition, MacroStep};
use keystack::keymap::{KeyMap, Layer};
use keystack::types::keycode::KeyCode;
use keystack::types::modifier::ModifierCombination;
use keystack::{a, df, func, k, layer, lt, mc, mo, mt, wm};
use log::debug;

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub const ROW: usize = 3;
pub const COL: usize = 5;

/// Function ids of the test keymap
pub const TEENSY_KEY: u8 = 0;
pub const COUNTER: u8 = 1;

/// Macro ids of the test keymap
pub const COPY: u8 = 0;
pub const PASTE: u8 = 1;

#[derive(Debug, Clone)]
pub struct TestKeyPress {
    pub row: u8,
    pub col: u8,
    pub pressed: bool,
    pub time: u64, // Timestamp of this key event in milliseconds
}

/// Modifiers of the Ctrl+Shift mod-tap key
pub const CTRL_SHIFT: ModifierCombination = ModifierCombination::new_from(false, false, false, true, true);

#[rustfmt::skip]
pub const LAYERS: [Layer<ROW, COL>; 3] = [
    layer!([
        [k!(Escape), k!(Kc1), k!(Kc2), k!(Kc3), mo!(1)],
        [k!(Q), k!(W), k!(E), k!(P), mo!(1)],
        [mt!(A, ModifierCombination::LCTRL), lt!(2, S), k!(D), wm!(Z, ModifierCombination::LSHIFT), mt!(F, CTRL_SHIFT)]
    ]),
    layer!([
        [func!(0), k!(F1), k!(F2), k!(F3), a!(Transparent)],
        [a!(Transparent), mc!(0), mc!(1), a!(Transparent), a!(Transparent)],
        [a!(Transparent), a!(Transparent), df!(2), func!(1, 3), a!(Transparent)]
    ]),
    layer!([
        [a!(Transparent), k!(Left), k!(Down), k!(Up), mo!(1)],
        [df!(0), a!(Transparent), a!(Transparent), a!(Transparent), a!(Transparent)],
        [a!(Transparent), a!(Transparent), k!(Right), a!(Transparent), a!(Transparent)]
    ]),
];

pub const MACROS: [MacroDefinition<'static>; 2] = [
    // Ctrl+C
    MacroDefinition::on_press(&[
        MacroStep::Wait(0),
        MacroStep::Down(KeyCode::LCtrl),
        MacroStep::Tap(KeyCode::C),
        MacroStep::Up(KeyCode::LCtrl),
    ]),
    // Ctrl+V
    MacroDefinition::on_press(&[
        MacroStep::Wait(0),
        MacroStep::Down(KeyCode::LCtrl),
        MacroStep::Tap(KeyCode::V),
        MacroStep::Up(KeyCode::LCtrl),
    ]),
];

/// Records every call. `TEENSY_KEY` asks for a shutdown when pressed, other ids are unknown.
#[derive(Debug, Default)]
pub struct TestFunctions {
    pub calls: std::vec::Vec<FunctionCall>,
}

impl FunctionHandler for TestFunctions {
    fn call(&mut self, call: FunctionCall) -> Option<FunctionOutcome> {
        debug!("Function called: {:?}", call);
        match call.id {
            TEENSY_KEY => {
                self.calls.push(call);
                if call.pressed {
                    Some(FunctionOutcome::Shutdown)
                } else {
                    Some(FunctionOutcome::Continue)
                }
            }
            COUNTER => {
                self.calls.push(call);
                Some(FunctionOutcome::Continue)
            }
            _ => None,
        }
    }
}

pub fn create_test_keyboard_with_config(config: BehaviorConfig) -> Keyboard<'static, ROW, COL, TestFunctions> {
    let keymap = KeyMap::new(&LAYERS, &MACROS, config).unwrap();
    Keyboard::new(keymap, TestFunctions::default())
}

pub fn create_test_keyboard() -> Keyboard<'static, ROW, COL, TestFunctions> {
    create_test_keyboard_with_config(BehaviorConfig::default())
}

pub fn key_event(row: u8, col: u8, pressed: bool, time: u64) -> KeyboardEvent {
    KeyboardEvent::key(row, col, pressed, Instant::from_millis(time))
}

/// Feed the key sequence to the keyboard and compare the emitted key events with `expected`.
/// Rejected events are logged and skipped.
pub fn run_key_sequence_test<const R: usize, const C: usize, F: FunctionHandler>(
    keyboard: &mut Keyboard<'_, R, C, F>,
    key_sequence: &[TestKeyPress],
    expected: &[KeyEvent],
) {
    let mut events = std::vec::Vec::new();
    for key in key_sequence {
        if let Err(e) = keyboard.process(key_event(key.row, key.col, key.pressed, key.time), &mut events) {
            debug!("Rejected {:?}: {:?}", key, e);
        }
    }
    assert_eq!(expected, events.as_slice(), "expected left but actually right");
}

#[macro_export]
macro_rules! key_sequence_test {
    (keyboard: $keyboard:expr, sequence: [$([$row:expr, $col:expr, $pressed:expr, $time:expr]),* $(,)?], expected: [$($expected:expr),* $(,)?]) => {
        let mut keyboard = $keyboard;
        let sequence = [
            $(
                $crate::common::TestKeyPress {
                    row: $row,
                    col: $col,
                    pressed: $pressed,
                    time: $time,
                },
            )*
        ];
        let expected: &[keystack::event::KeyEvent] = &[$($expected),*];
        $crate::common::run_key_sequence_test(&mut keyboard, &sequence, expected);
    };
}

/// `down!(A)` is `KeyEvent::KeyDown(KeyCode::A)`
#[macro_export]
macro_rules! down {
    ($k: ident) => {
        keystack::event::KeyEvent::KeyDown(keystack::types::keycode::KeyCode::$k)
    };
}

/// `up!(A)` is `KeyEvent::KeyUp(KeyCode::A)`
#[macro_export]
macro_rules! up {
    ($k: ident) => {
        keystack::event::KeyEvent::KeyUp(keystack::types::keycode::KeyCode::$k)
    };
}
