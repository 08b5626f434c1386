//! Layer-stack action resolution for keyboard firmware.
//!
//! Debounced matrix events go in, an ordered stream of virtual key events comes out. In between,
//! each press is resolved against a stack of keymap layers, dual-role keys are disambiguated as tap
//! or hold, macros are replayed and external functions are invoked.
//!
//! ```ignore
//! let keymap = KeyMap::new(&LAYERS, &MACROS, BehaviorConfig::default())?;
//! let mut keyboard = Keyboard::new(keymap, MyFunctions);
//! keyboard.run(input_channel.receiver(), output_channel.sender()).await;
//! ```
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

// This mod MUST go first, so that the others see its macros.
#[macro_use]
pub(crate) mod fmt;

pub mod config;
pub mod event;
pub mod function;
pub mod hid;
pub mod keyboard;
pub mod keyboard_macros;
pub mod keycode_table;
pub mod keymap;
pub mod layer_stack;
pub mod layout_macro;
pub mod tap_hold;

pub use keyboard::{DispatchError, Keyboard, run_tick_source};
pub use keymap::KeyMap;
pub use keystack_types as types;
