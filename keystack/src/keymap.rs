use keystack_types::action::Action;

use crate::config::{BehaviorConfig, ConfigError, MAX_LAYER_DEPTH, MAX_MACRO_EVENTS};
use crate::event::KeyPos;
use crate::keyboard_macros::{MacroDefinition, MacroPlayer};
use crate::layer_stack::LayerStack;

/// A single layer: one action per matrix position
pub type Layer<const ROW: usize, const COL: usize> = [[Action; COL]; ROW];

/// Keymap is the immutable, validated keycode table: layers of actions indexed by
/// `(layer, row, col)`, plus the macro definitions referenced from the layers.
///
/// The conception is borrowed from qmk: <https://docs.qmk.fm/#/keymap>.
/// Layer 0 is the base layer, higher layers only need to define what they override and use
/// `Action::Transparent` elsewhere.
pub struct KeyMap<'a, const ROW: usize, const COL: usize> {
    /// Layers
    layers: &'a [Layer<ROW, COL>],
    /// Macros referenced by `Action::Macro`
    macros: MacroPlayer<'a>,
    /// Options for configurable action behavior
    behavior: BehaviorConfig,
}

impl<'a, const ROW: usize, const COL: usize> KeyMap<'a, ROW, COL> {
    /// Validate and wrap the keycode table.
    ///
    /// Fails if there's no base layer, if an action references an undefined layer or macro, if a
    /// referenced macro emits more than [`MAX_MACRO_EVENTS`] events, or if the layers reachable
    /// through momentary actions can't fit in the configured layer stack.
    pub fn new(
        layers: &'a [Layer<ROW, COL>],
        macros: &'a [MacroDefinition<'a>],
        behavior: BehaviorConfig,
    ) -> Result<Self, ConfigError> {
        if layers.is_empty() {
            return Err(ConfigError::NoLayers);
        }
        if layers.len() > u8::MAX as usize + 1 {
            return Err(ConfigError::TooManyLayers(layers.len()));
        }
        if behavior.max_layer_depth > MAX_LAYER_DEPTH {
            return Err(ConfigError::MaxDepthTooLarge(behavior.max_layer_depth));
        }

        let player = MacroPlayer::new(macros);
        // Layers which can be pushed onto the stack, each occupies at most one entry
        let mut momentary = [false; u8::MAX as usize + 1];
        for (layer_idx, layer) in layers.iter().enumerate() {
            for (row, actions) in layer.iter().enumerate() {
                for (col, action) in actions.iter().enumerate() {
                    let (layer, row, col) = (layer_idx as u8, row as u8, col as u8);
                    if let Some(target) = action.referenced_layer()
                        && target as usize >= layers.len()
                    {
                        return Err(ConfigError::UndefinedLayer { target, layer, row, col });
                    }
                    if let Action::Macro(id) = *action {
                        let Some(definition) = player.get(id) else {
                            return Err(ConfigError::UndefinedMacro { id, layer, row, col });
                        };
                        let events = definition.max_event_count();
                        if events > MAX_MACRO_EVENTS {
                            return Err(ConfigError::MacroTooLong {
                                id,
                                events,
                                max: MAX_MACRO_EVENTS,
                            });
                        }
                    }
                    if let Some(target) = action.momentary_layer() {
                        momentary[target as usize] = true;
                    }
                }
            }
        }

        let required = 1 + momentary.iter().filter(|m| **m).count();
        if required > behavior.max_layer_depth {
            return Err(ConfigError::LayerDepthExceeded {
                required,
                max: behavior.max_layer_depth,
            });
        }

        Ok(Self {
            layers,
            macros: player,
            behavior,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn behavior(&self) -> &BehaviorConfig {
        &self.behavior
    }

    pub fn macros(&self) -> &MacroPlayer<'a> {
        &self.macros
    }

    /// Whether the position is inside the matrix
    pub fn contains(&self, pos: KeyPos) -> bool {
        (pos.row as usize) < ROW && (pos.col as usize) < COL
    }

    /// The action defined at `pos` on `layer`, without falling through transparent actions.
    /// Positions or layers outside the keymap are unmapped and yield `Action::No`.
    pub fn action_at(&self, pos: KeyPos, layer: u8) -> Action {
        self.layers
            .get(layer as usize)
            .and_then(|l| l.get(pos.row as usize))
            .and_then(|r| r.get(pos.col as usize))
            .copied()
            .unwrap_or(Action::No)
    }

    /// Resolve the action at `pos` through the active layers, from the top of the stack down.
    ///
    /// Transparent actions defer to the next lower active layer. If every active layer is
    /// transparent at `pos`, the result is `Action::No`. Resolution depends only on the
    /// arguments, so it must be redone on every press.
    pub fn resolve(&self, pos: KeyPos, stack: &LayerStack) -> Action {
        for layer in stack.active_order() {
            let action = self.action_at(pos, layer);
            if action != Action::Transparent {
                return action;
            }
        }
        Action::No
    }
}

/// Build a layer from a flat, row-major action list.
/// The list must contain exactly `ROW * COL` actions.
pub fn layer_from_flat<const ROW: usize, const COL: usize>(actions: &[Action]) -> Result<Layer<ROW, COL>, ConfigError> {
    if actions.len() != ROW * COL {
        return Err(ConfigError::LayerSizeMismatch {
            expected: ROW * COL,
            actual: actions.len(),
        });
    }
    let mut layer = [[Action::No; COL]; ROW];
    for (i, action) in actions.iter().enumerate() {
        layer[i / COL][i % COL] = *action;
    }
    Ok(layer)
}
