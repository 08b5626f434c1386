/// Create a layer in keymap
#[macro_export]
macro_rules! layer {
    ([$([$($x: expr), +]), +]) => {
        [$([$($x), +]),+]
    };
}

/// Create a normal key. For example, `k!(A)` represents `Action::Key(KeyCode::A)`
#[macro_export]
macro_rules! k {
    ($k: ident) => {
        $crate::types::action::Action::Key($crate::types::keycode::KeyCode::$k)
    };
}

/// Create an action without parameters, `a!(No)` or `a!(Transparent)`
#[macro_export]
macro_rules! a {
    ($a: ident) => {
        $crate::types::action::Action::$a
    };
}

/// Create a normal key with modifier action, e.g. `wm!(C, ModifierCombination::LCTRL)`
#[macro_export]
macro_rules! wm {
    ($x: ident, $m: expr) => {
        $crate::types::action::Action::KeyWithModifier($crate::types::keycode::KeyCode::$x, $m)
    };
}

/// Create a momentary layer action. For example, `mo!(1)` activates layer 1 while held.
#[macro_export]
macro_rules! mo {
    ($x: literal) => {
        $crate::types::action::Action::LayerMomentary($x)
    };
}

/// Create a default layer set action
#[macro_export]
macro_rules! df {
    ($x: literal) => {
        $crate::types::action::Action::LayerSet($x)
    };
}

/// Create a layer-tap action: tap sends the key, hold activates the layer
#[macro_export]
macro_rules! lt {
    ($x: literal, $k: ident) => {
        $crate::types::action::Action::LayerTapKey($x, $crate::types::keycode::KeyCode::$k)
    };
}

/// Create a modifier-tap action: tap sends the key, hold holds the modifiers
#[macro_export]
macro_rules! mt {
    ($k: ident, $m: expr) => {
        $crate::types::action::Action::ModTapKey($m, $crate::types::keycode::KeyCode::$k)
    };
}

/// Create a macro trigger
#[macro_export]
macro_rules! mc {
    ($id: literal) => {
        $crate::types::action::Action::Macro($id)
    };
}

/// Create an external function action, with an optional option byte
#[macro_export]
macro_rules! func {
    ($id: literal) => {
        $crate::types::action::Action::Function($id, 0)
    };
    ($id: literal, $opt: literal) => {
        $crate::types::action::Action::Function($id, $opt)
    };
}
