pub mod common;

use keystack::config::{BehaviorConfig, ConfigError, MAX_MACRO_EVENTS};
use keystack::keyboard_macros::{MacroDefinition, MacroStep};
use keystack::keymap::KeyMap;
use keystack::types::keycode::KeyCode;
use keystack::{k, mc};

use crate::common::{create_test_keyboard, key_event};

#[test]
fn test_copy_macro() {
    key_sequence_test! {
        keyboard: create_test_keyboard(),
        sequence: [
            [0, 4, true, 0],
            [1, 1, true, 10],
            [1, 1, false, 20],
            [0, 4, false, 30],
        ],
        expected: [down!(LCtrl), down!(C), up!(C), up!(LCtrl)]
    };
}

#[test]
fn test_paste_macro_then_key() {
    key_sequence_test! {
        keyboard: create_test_keyboard(),
        sequence: [
            [0, 4, true, 0],
            [1, 2, true, 10],
            [1, 0, true, 15],
            [1, 2, false, 20],
            [1, 0, false, 25],
            [0, 4, false, 30],
        ],
        expected: [down!(LCtrl), down!(V), up!(V), up!(LCtrl), down!(Q), up!(Q)]
    };
}

#[test]
fn test_macro_release_emits_nothing() {
    let mut keyboard = create_test_keyboard();
    let mut events = Vec::new();
    keyboard.process(key_event(0, 4, true, 0), &mut events).unwrap();
    keyboard.process(key_event(1, 1, true, 10), &mut events).unwrap();
    assert_eq!(events.len(), 4);

    events.clear();
    keyboard.process(key_event(1, 1, false, 20), &mut events).unwrap();
    assert!(events.is_empty());
}

#[test]
fn test_macro_replayed_after_tap() {
    // The macro key is pressed while a tap/hold key is pending, the tap comes first
    key_sequence_test! {
        keyboard: create_test_keyboard(),
        sequence: [
            [0, 4, true, 0],
            [2, 0, true, 10],
            [1, 1, true, 20],
            [2, 0, false, 30],
            [1, 1, false, 40],
            [0, 4, false, 50],
        ],
        expected: [down!(A), up!(A), down!(LCtrl), down!(C), up!(C), up!(LCtrl)]
    };
}

#[test]
fn test_macro_with_release_steps() {
    const SHIFT_HOLD: [MacroDefinition<'static>; 1] = [MacroDefinition::new(
        &[MacroStep::Down(KeyCode::LShift)],
        &[MacroStep::Up(KeyCode::LShift)],
    )];
    let layers = [[[mc!(0), k!(A)]]];
    let keymap = KeyMap::new(&layers, &SHIFT_HOLD, BehaviorConfig::default()).unwrap();

    key_sequence_test! {
        keyboard: keystack::keyboard::Keyboard::new(keymap, ()),
        sequence: [
            [0, 0, true, 0],
            [0, 1, true, 10],
            [0, 1, false, 20],
            [0, 0, false, 30],
        ],
        expected: [down!(LShift), down!(A), up!(A), up!(LShift)]
    };
}

#[test]
fn test_undefined_macro_is_rejected() {
    let layers = [[[mc!(0), mc!(2)]]];
    let macros = [MacroDefinition::on_press(&[MacroStep::Tap(KeyCode::A)])];
    assert_eq!(
        KeyMap::new(&layers, &macros, BehaviorConfig::default()).err(),
        Some(ConfigError::UndefinedMacro {
            id: 2,
            layer: 0,
            row: 0,
            col: 1
        })
    );
}

#[test]
fn test_macro_longer_than_output_buffer_is_rejected() {
    let mut steps = vec![MacroStep::Down(KeyCode::LCtrl)];
    steps.extend([MacroStep::Tap(KeyCode::A); 38]);
    steps.push(MacroStep::Up(KeyCode::LCtrl));
    let macros = [MacroDefinition::on_press(&steps)];
    let layers = [[[k!(A), mc!(0)]]];
    assert_eq!(
        KeyMap::new(&layers, &macros, BehaviorConfig::default()).err(),
        Some(ConfigError::MacroTooLong {
            id: 0,
            events: 78,
            max: MAX_MACRO_EVENTS
        })
    );
}
