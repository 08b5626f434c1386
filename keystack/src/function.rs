//! External functions bound through `Action::Function`.
//!
//! The keyboard invokes the handler exactly once for every resolved press and release of a
//! function key and passes the option byte through unchanged. What a function does is up to the
//! integration, e.g. jumping to the bootloader.

/// A single function invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FunctionCall {
    pub id: u8,
    pub opt: u8,
    pub pressed: bool,
}

/// What the keyboard does after a function returns
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FunctionOutcome {
    /// Keep processing events
    Continue,
    /// Stop the event loop, e.g. before entering a firmware update mode
    Shutdown,
}

pub trait FunctionHandler {
    /// Run the function, returns `None` if `call.id` isn't a known function
    fn call(&mut self, call: FunctionCall) -> Option<FunctionOutcome>;
}

/// No functions are defined, every function key is unknown
impl FunctionHandler for () {
    fn call(&mut self, _call: FunctionCall) -> Option<FunctionOutcome> {
        None
    }
}
