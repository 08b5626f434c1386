//! # keystack types
//!
//! Fundamental type definitions shared by keymap authoring and the keystack runtime.
//!
//! - [`action`] - the per-position actions stored in a keymap layer
//! - [`keycode`] - HID keyboard page keycodes, including modifiers
//! - [`modifier`] - packed modifier combinations and HID modifier bytes

#![no_std]

pub mod action;
pub mod keycode;
pub mod modifier;
