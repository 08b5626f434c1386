use core::fmt;

use embassy_time::Duration;

/// Upper bound of the layer stack capacity, the configured depth cannot exceed it
pub const MAX_LAYER_DEPTH: usize = 32;

/// Upper bound of the key events a macro may emit for a press or a release
pub const MAX_MACRO_EVENTS: usize = 64;

/// Config for configurable action behavior
#[derive(Clone, Copy, Debug)]
pub struct BehaviorConfig {
    pub tap_hold: TapHoldConfig,
    /// Maximum number of layer stack entries, including the default layer
    pub max_layer_depth: usize,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            tap_hold: TapHoldConfig::default(),
            max_layer_depth: 8,
        }
    }
}

/// How a pending tap/hold key reacts to other keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapHoldMode {
    /// Another key pressed and released while the tap/hold key is held resolves it as hold
    #[default]
    PermissiveHold,
    /// Any other key press while the tap/hold key is held resolves it as hold
    HoldOnOtherPress,
    /// Only the tap term decides
    Normal,
}

/// Configurations for tap hold behavior
#[derive(Clone, Copy, Debug)]
pub struct TapHoldConfig {
    /// Keys held at least this long are holds
    pub tap_term: Duration,
    pub mode: TapHoldMode,
}

impl Default for TapHoldConfig {
    fn default() -> Self {
        Self {
            tap_term: Duration::from_millis(150),
            mode: TapHoldMode::PermissiveHold,
        }
    }
}

/// Fatal keymap configuration problems, detected before any event is processed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The keymap has no layer 0
    NoLayers,
    /// More layers than a `u8` layer id can address
    TooManyLayers(usize),
    /// Configured depth is larger than the layer stack capacity
    MaxDepthTooLarge(usize),
    /// The layers reachable through momentary actions can't fit in the layer stack
    LayerDepthExceeded { required: usize, max: usize },
    /// An action references a layer that doesn't exist
    UndefinedLayer { target: u8, layer: u8, row: u8, col: u8 },
    /// An action references a macro that doesn't exist
    UndefinedMacro { id: u8, layer: u8, row: u8, col: u8 },
    /// A referenced macro emits more events than the output buffer holds
    MacroTooLong { id: u8, events: usize, max: usize },
    /// A flat layer doesn't match the matrix dimensions
    LayerSizeMismatch { expected: usize, actual: usize },
    /// A keycode table contains a code without a keycode
    UnknownKeycode { row: u8, col: u8, code: u8 },
    /// A keycode table references an `FN` slot without an action
    UndefinedFnAction(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoLayers => write!(f, "keymap has no layers"),
            ConfigError::TooManyLayers(n) => write!(f, "keymap has {} layers, at most 256 are supported", n),
            ConfigError::MaxDepthTooLarge(depth) => {
                write!(f, "max layer depth {} exceeds capacity {}", depth, MAX_LAYER_DEPTH)
            }
            ConfigError::LayerDepthExceeded { required, max } => {
                write!(f, "layer stack may need {} entries, max depth is {}", required, max)
            }
            ConfigError::UndefinedLayer { target, layer, row, col } => write!(
                f,
                "action at layer {} ({}, {}) references undefined layer {}",
                layer, row, col, target
            ),
            ConfigError::UndefinedMacro { id, layer, row, col } => write!(
                f,
                "action at layer {} ({}, {}) references undefined macro {}",
                layer, row, col, id
            ),
            ConfigError::MacroTooLong { id, events, max } => {
                write!(f, "macro {} emits {} events, at most {} are supported", id, events, max)
            }
            ConfigError::LayerSizeMismatch { expected, actual } => {
                write!(f, "layer has {} actions, matrix has {} positions", actual, expected)
            }
            ConfigError::UnknownKeycode { row, col, code } => {
                write!(f, "unknown keycode {:#04x} at ({}, {})", code, row, col)
            }
            ConfigError::UndefinedFnAction(index) => write!(f, "FN{} has no action", index),
        }
    }
}
