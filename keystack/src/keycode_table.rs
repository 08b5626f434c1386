//! Layers written as raw 8-bit keycodes, the way TMK keymaps are authored.
//!
//! `0x00` is no action, `0x01` is transparent, `0xC0..=0xDF` are `FN0..FN31` which index a
//! table of actions, every other value is a HID keyboard usage.

use keystack_types::action::Action;
use keystack_types::keycode::KeyCode;

use crate::config::ConfigError;
use crate::keymap::Layer;

/// Raw code of "no action"
pub const RAW_NO: u8 = 0x00;
/// Raw code of "transparent"
pub const RAW_TRANSPARENT: u8 = 0x01;
/// Raw code of `FN0`, `FN31` is `RAW_FN0 + 31`
pub const RAW_FN0: u8 = 0xC0;
/// Number of `FN` slots
pub const NUM_FN: u8 = 32;

/// Convert a single raw keycode at `(row, col)` to an action
pub fn convert_keycode(code: u8, fn_actions: &[Action], row: u8, col: u8) -> Result<Action, ConfigError> {
    match code {
        RAW_NO => Ok(Action::No),
        RAW_TRANSPARENT => Ok(Action::Transparent),
        c if (RAW_FN0..RAW_FN0 + NUM_FN).contains(&c) => {
            let index = c - RAW_FN0;
            fn_actions
                .get(index as usize)
                .copied()
                .ok_or(ConfigError::UndefinedFnAction(index))
        }
        c => match KeyCode::from_repr(c) {
            Some(key) if !key.is_reserved() => Ok(Action::Key(key)),
            _ => Err(ConfigError::UnknownKeycode { row, col, code: c }),
        },
    }
}

/// Convert a raw keycode layer to a layer of actions.
///
/// Fails on the first code without a keycode or `FN` slot without an entry in `fn_actions`.
pub fn convert_keycode_layer<const ROW: usize, const COL: usize>(
    raw: &[[u8; COL]; ROW],
    fn_actions: &[Action],
) -> Result<Layer<ROW, COL>, ConfigError> {
    let mut layer = [[Action::No; COL]; ROW];
    for (row, codes) in raw.iter().enumerate() {
        for (col, code) in codes.iter().enumerate() {
            layer[row][col] = convert_keycode(*code, fn_actions, row as u8, col as u8)?;
        }
    }
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{df, func, k, mc, mo};

    // FN0 sets the default layer, FN1 is momentary, FN2..FN6 are unassigned
    const FN_ACTIONS: [Action; 10] = [
        df!(0),
        mo!(1),
        Action::No,
        Action::No,
        Action::No,
        Action::No,
        Action::No,
        func!(0),
        mc!(0),
        mc!(1),
    ];

    #[test]
    fn test_convert_layer() {
        let raw = [[0x29, 0x1E, 0x00], [0x01, 0xC1, 0xC8]];
        let layer = convert_keycode_layer(&raw, &FN_ACTIONS).unwrap();
        assert_eq!(layer[0], [k!(Escape), k!(Kc1), Action::No]);
        assert_eq!(layer[1], [Action::Transparent, mo!(1), mc!(0)]);
    }

    #[test]
    fn test_modifier_codes_are_keys() {
        assert_eq!(convert_keycode(0xE0, &[], 0, 0), Ok(k!(LCtrl)));
        assert_eq!(convert_keycode(0xE7, &[], 0, 0), Ok(k!(RGui)));
    }

    #[test]
    fn test_undefined_fn_slot() {
        let raw = [[0x04, 0xCA]];
        assert_eq!(
            convert_keycode_layer(&raw, &FN_ACTIONS).err(),
            Some(ConfigError::UndefinedFnAction(10))
        );
        assert_eq!(convert_keycode(0xDF, &FN_ACTIONS, 0, 0), Err(ConfigError::UndefinedFnAction(31)));
    }

    #[test]
    fn test_unknown_keycode() {
        let raw = [[0x04, 0x05], [0x06, 0xA5]];
        assert_eq!(
            convert_keycode_layer(&raw, &FN_ACTIONS).err(),
            Some(ConfigError::UnknownKeycode {
                row: 1,
                col: 1,
                code: 0xA5
            })
        );
        // HID error codes aren't keys
        assert!(convert_keycode(0x02, &[], 0, 0).is_err());
        assert!(convert_keycode(0xE8, &[], 0, 0).is_err());
    }
}
