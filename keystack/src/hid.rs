//! HID boot keyboard reports built from the key event stream.

use keystack_types::modifier::HidModifiers;
use usbd_hid::descriptor::generator_prelude::*;

use crate::event::KeyEvent;

/// KeyboardReport describes a report and its companion descriptor that can be
/// used to send keyboard button presses to a host and receive the status of the
/// keyboard LEDs.
#[gen_hid_descriptor(
    (collection = APPLICATION, usage_page = GENERIC_DESKTOP, usage = KEYBOARD) = {
        (usage_page = KEYBOARD, usage_min = 0xE0, usage_max = 0xE7) = {
            #[packed_bits = 8] #[item_settings(data,variable,absolute)] modifier=input;
        };
        (logical_min = 0,) = {
            #[item_settings(constant,variable,absolute)] reserved=input;
        };
        (usage_page = LEDS, usage_min = 0x01, usage_max = 0x05) = {
            #[packed_bits = 5] #[item_settings(data,variable,absolute)] leds=output;
        };
        (usage_page = KEYBOARD, usage_min = 0x00, usage_max = 0xDD) = {
            #[item_settings(data,array,absolute)] keycodes=input;
        };
    }
)]
#[allow(dead_code)]
#[derive(Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    pub modifier: u8, // HidModifiers
    pub reserved: u8,
    pub leds: u8,
    pub keycodes: [u8; 6],
}

/// Number of non-modifier keys a boot keyboard report can carry
pub const KEYBOARD_REPORT_KEYS: usize = 6;

/// Pressed keys as seen by the host.
///
/// Every [`KeyEvent`] produces one report. Modifiers go to the modifier byte, other keys occupy
/// the first free slot of the 6KRO array and free it when released.
#[derive(Debug, Default, Clone)]
pub struct HidReportState {
    modifiers: HidModifiers,
    keycodes: [u8; KEYBOARD_REPORT_KEYS],
}

impl HidReportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `event` into the state and return the resulting report
    pub fn apply(&mut self, event: KeyEvent) -> KeyboardReport {
        let key = event.keycode();
        if key.is_modifier() {
            if event.is_down() {
                self.modifiers |= key.to_hid_modifiers();
            } else {
                self.modifiers = self.modifiers & !key.to_hid_modifiers();
            }
        } else if !key.is_reserved() {
            let code = key.as_u8();
            if event.is_down() {
                if !self.keycodes.contains(&code) {
                    match self.keycodes.iter_mut().find(|k| **k == 0) {
                        Some(slot) => *slot = code,
                        None => warn!("Keyboard report is full, {:?} isn't reported", key),
                    }
                }
            } else if let Some(slot) = self.keycodes.iter_mut().find(|k| **k == code) {
                *slot = 0;
            }
        }
        self.report()
    }

    /// The report for the current state
    pub fn report(&self) -> KeyboardReport {
        KeyboardReport {
            modifier: self.modifiers.into_bits(),
            reserved: 0,
            leds: 0,
            keycodes: self.keycodes,
        }
    }

    pub fn modifiers(&self) -> HidModifiers {
        self.modifiers
    }
}
