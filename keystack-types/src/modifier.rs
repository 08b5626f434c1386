use core::ops::{BitAnd, BitOr, BitOrAssign, Not};

use bitfield_struct::bitfield;
use serde::{Deserialize, Serialize};

use crate::keycode::KeyCode;

/// A set of modifiers on one side of the keyboard, packed into 5 bits (LSB first).
///
/// | bit4 | bit3 | bit2 | bit1 | bit0 |
/// | --- | --- | --- | --- | --- |
/// | L/R | GUI | ALT |SHIFT| CTRL|
#[bitfield(u8, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Serialize, Deserialize, Eq, PartialEq)]
pub struct ModifierCombination {
    #[bits(1)]
    pub ctrl: bool,
    #[bits(1)]
    pub shift: bool,
    #[bits(1)]
    pub alt: bool,
    #[bits(1)]
    pub gui: bool,
    #[bits(1)]
    pub right: bool,
    #[bits(3)]
    _reserved: u8,
}

impl BitOr for ModifierCombination {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() | rhs.into_bits())
    }
}

impl ModifierCombination {
    pub const LCTRL: Self = Self::new().with_ctrl(true);
    pub const LSHIFT: Self = Self::new().with_shift(true);
    pub const LALT: Self = Self::new().with_alt(true);
    pub const LGUI: Self = Self::new().with_gui(true);
    pub const RCTRL: Self = Self::new().with_right(true).with_ctrl(true);
    pub const RSHIFT: Self = Self::new().with_right(true).with_shift(true);
    pub const RALT: Self = Self::new().with_right(true).with_alt(true);
    pub const RGUI: Self = Self::new().with_right(true).with_gui(true);

    pub const fn new_from(right: bool, gui: bool, alt: bool, shift: bool, ctrl: bool) -> Self {
        ModifierCombination::new()
            .with_right(right)
            .with_gui(gui)
            .with_alt(alt)
            .with_shift(shift)
            .with_ctrl(ctrl)
    }

    /// Collapse a HID modifier byte into a combination. Any right-hand modifier makes
    /// the whole combination right-handed.
    pub fn from_hid_modifiers(modifiers: HidModifiers) -> Self {
        Self::new_from(
            modifiers.right_ctrl() || modifiers.right_shift() || modifiers.right_alt() || modifiers.right_gui(),
            modifiers.left_gui() || modifiers.right_gui(),
            modifiers.left_alt() || modifiers.right_alt(),
            modifiers.left_shift() || modifiers.right_shift(),
            modifiers.left_ctrl() || modifiers.right_ctrl(),
        )
    }

    /// Bits of the HID report modifier byte covered by this combination
    pub fn to_hid_modifiers(self) -> HidModifiers {
        if self.right() {
            HidModifiers::new()
                .with_right_ctrl(self.ctrl())
                .with_right_shift(self.shift())
                .with_right_alt(self.alt())
                .with_right_gui(self.gui())
        } else {
            HidModifiers::new()
                .with_left_ctrl(self.ctrl())
                .with_left_shift(self.shift())
                .with_left_alt(self.alt())
                .with_left_gui(self.gui())
        }
    }

    /// Modifier keycodes of this combination, ordered ctrl, shift, alt, gui.
    /// Returns the keycode buffer and the number of valid entries.
    pub fn to_modifier_keycodes(self) -> ([KeyCode; 4], usize) {
        let (ctrl, shift, alt, gui) = if self.right() {
            (KeyCode::RCtrl, KeyCode::RShift, KeyCode::RAlt, KeyCode::RGui)
        } else {
            (KeyCode::LCtrl, KeyCode::LShift, KeyCode::LAlt, KeyCode::LGui)
        };
        let mut keycodes = [KeyCode::No; 4];
        let mut n = 0;
        for (enabled, keycode) in [(self.ctrl(), ctrl), (self.shift(), shift), (self.alt(), alt), (self.gui(), gui)] {
            if enabled {
                keycodes[n] = keycode;
                n += 1;
            }
        }
        (keycodes, n)
    }

    pub fn is_empty(self) -> bool {
        !(self.ctrl() || self.shift() || self.alt() || self.gui())
    }
}

/// The modifier byte of a HID keyboard report
#[bitfield(u8, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Serialize, Deserialize, Eq, PartialEq)]
pub struct HidModifiers {
    #[bits(1)]
    pub left_ctrl: bool,
    #[bits(1)]
    pub left_shift: bool,
    #[bits(1)]
    pub left_alt: bool,
    #[bits(1)]
    pub left_gui: bool,
    #[bits(1)]
    pub right_ctrl: bool,
    #[bits(1)]
    pub right_shift: bool,
    #[bits(1)]
    pub right_alt: bool,
    #[bits(1)]
    pub right_gui: bool,
}

impl BitOr for HidModifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() | rhs.into_bits())
    }
}

impl BitAnd for HidModifiers {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() & rhs.into_bits())
    }
}

impl Not for HidModifiers {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::from_bits(!self.into_bits())
    }
}

impl BitOrAssign for HidModifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}
