//! Keyboard actions.
//!
//! An [`Action`] is what a single matrix position does on one layer. Layers are
//! dense arrays of actions; the runtime resolves a position through the active
//! layer stack and then executes the action it finds.

use serde::{Deserialize, Serialize};

use crate::keycode::KeyCode;
use crate::modifier::ModifierCombination;

/// The action at a keyboard position, stored in a keymap layer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// No action
    #[default]
    No,
    /// Not defined on this layer, the next lower active layer is checked
    Transparent,
    /// A plain key stroke, pressed while the physical key is held
    Key(KeyCode),
    /// Key stroke with a modifier combination held around it
    KeyWithModifier(KeyCode, ModifierCombination),
    /// Activate a layer while the key is held
    LayerMomentary(u8),
    /// Replace the default (bottom) layer
    LayerSet(u8),
    /// Tap: send the keycode. Hold: activate the layer.
    LayerTapKey(u8, KeyCode),
    /// Tap: send the keycode. Hold: hold the modifiers.
    ModTapKey(ModifierCombination, KeyCode),
    /// Play the macro with the given id
    Macro(u8),
    /// Invoke an external function: (function id, option byte)
    Function(u8, u8),
}

impl Action {
    /// Whether the action needs a tap/hold decision before it can run
    pub fn is_dual_role(&self) -> bool {
        matches!(self, Action::LayerTapKey(_, _) | Action::ModTapKey(_, _))
    }

    /// Layer referenced by this action, if any
    pub fn referenced_layer(&self) -> Option<u8> {
        match self {
            Action::LayerMomentary(layer) | Action::LayerSet(layer) | Action::LayerTapKey(layer, _) => Some(*layer),
            _ => None,
        }
    }

    /// Layer this action may push onto the layer stack
    pub fn momentary_layer(&self) -> Option<u8> {
        match self {
            Action::LayerMomentary(layer) | Action::LayerTapKey(layer, _) => Some(*layer),
            _ => None,
        }
    }
}
