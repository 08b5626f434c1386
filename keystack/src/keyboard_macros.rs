//! Keyboard macros.
//!
//! A macro is authored as two step lists, one replayed when the macro key is pressed and
//! one when it's released. Most macros put the whole chord into the press list, e.g. copy:
//!
//! ```ignore
//! const COPY: MacroDefinition = MacroDefinition::on_press(&[
//!     MacroStep::Down(KeyCode::LCtrl),
//!     MacroStep::Tap(KeyCode::C),
//!     MacroStep::Up(KeyCode::LCtrl),
//! ]);
//! ```

use keystack_types::keycode::KeyCode;

use crate::event::{KeyEvent, KeyEventSink};

/// One authored macro step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacroStep {
    /// Press a key
    Down(KeyCode),
    /// Release a key
    Up(KeyCode),
    /// Press then release a key
    Tap(KeyCode),
    /// Wait marker in ms, kept for authoring only. It emits nothing on replay.
    Wait(u16),
}

impl MacroStep {
    /// Number of virtual key events this step emits
    pub fn event_count(&self) -> usize {
        match self {
            MacroStep::Down(_) | MacroStep::Up(_) => 1,
            MacroStep::Tap(_) => 2,
            MacroStep::Wait(_) => 0,
        }
    }

    /// Emit the virtual key events of this step, returns the number of emitted events
    fn expand(&self, sink: &mut impl KeyEventSink) -> usize {
        match *self {
            MacroStep::Down(k) => {
                sink.send(KeyEvent::KeyDown(k));
                1
            }
            MacroStep::Up(k) => {
                sink.send(KeyEvent::KeyUp(k));
                1
            }
            MacroStep::Tap(k) => {
                sink.send(KeyEvent::KeyDown(k));
                sink.send(KeyEvent::KeyUp(k));
                2
            }
            MacroStep::Wait(_) => 0,
        }
    }
}

/// Step lists of a macro, selected by the phase of the triggering key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroDefinition<'a> {
    on_press: &'a [MacroStep],
    on_release: &'a [MacroStep],
}

impl<'a> MacroDefinition<'a> {
    pub const fn new(on_press: &'a [MacroStep], on_release: &'a [MacroStep]) -> Self {
        Self { on_press, on_release }
    }

    /// Macro which plays on press only, release emits nothing
    pub const fn on_press(steps: &'a [MacroStep]) -> Self {
        Self::new(steps, &[])
    }

    pub fn steps(&self, pressed: bool) -> &'a [MacroStep] {
        if pressed { self.on_press } else { self.on_release }
    }

    /// Number of virtual key events emitted by the longer phase
    pub fn max_event_count(&self) -> usize {
        let count = |steps: &[MacroStep]| steps.iter().map(MacroStep::event_count).sum::<usize>();
        count(self.on_press).max(count(self.on_release))
    }
}

/// Replays macros by id
#[derive(Clone, Copy)]
pub struct MacroPlayer<'a> {
    macros: &'a [MacroDefinition<'a>],
}

impl<'a> MacroPlayer<'a> {
    pub fn new(macros: &'a [MacroDefinition<'a>]) -> Self {
        Self { macros }
    }

    pub fn contains(&self, id: u8) -> bool {
        (id as usize) < self.macros.len()
    }

    pub fn get(&self, id: u8) -> Option<&MacroDefinition<'a>> {
        self.macros.get(id as usize)
    }

    /// Emit every step of macro `id` for the given phase, in order, without interleaving.
    ///
    /// Returns the number of emitted events, or `None` if the macro is not defined.
    pub fn play(&self, id: u8, pressed: bool, sink: &mut impl KeyEventSink) -> Option<usize> {
        let definition = self.get(id)?;
        let mut emitted = 0;
        for step in definition.steps(pressed) {
            emitted += step.expand(sink);
        }
        debug!("Macro {} ({}) emitted {} events", id, pressed, emitted);
        Some(emitted)
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;

    const COPY: MacroDefinition = MacroDefinition::on_press(&[
        MacroStep::Wait(0),
        MacroStep::Down(KeyCode::LCtrl),
        MacroStep::Tap(KeyCode::C),
        MacroStep::Up(KeyCode::LCtrl),
    ]);

    const SHIFT_HOLD: MacroDefinition =
        MacroDefinition::new(&[MacroStep::Down(KeyCode::LShift)], &[MacroStep::Up(KeyCode::LShift)]);

    #[test]
    fn test_play_press_phase() {
        let macros = [COPY];
        let player = MacroPlayer::new(&macros);
        let mut out = Vec::new();
        assert_eq!(player.play(0, true, &mut out), Some(4));
        assert_eq!(
            out,
            [
                KeyEvent::KeyDown(KeyCode::LCtrl),
                KeyEvent::KeyDown(KeyCode::C),
                KeyEvent::KeyUp(KeyCode::C),
                KeyEvent::KeyUp(KeyCode::LCtrl),
            ]
        );

        out.clear();
        assert_eq!(player.play(0, false, &mut out), Some(0));
        assert!(out.is_empty());
    }

    #[test]
    fn test_play_release_phase() {
        let macros = [COPY, SHIFT_HOLD];
        let player = MacroPlayer::new(&macros);
        let mut out = Vec::new();
        player.play(1, true, &mut out);
        player.play(1, false, &mut out);
        assert_eq!(out, [KeyEvent::KeyDown(KeyCode::LShift), KeyEvent::KeyUp(KeyCode::LShift)]);
    }

    #[test]
    fn test_event_count() {
        assert_eq!(COPY.max_event_count(), 4);
        assert_eq!(SHIFT_HOLD.max_event_count(), 1);
        let release_heavy = MacroDefinition::new(&[MacroStep::Wait(10)], &[MacroStep::Tap(KeyCode::A), MacroStep::Tap(KeyCode::B)]);
        assert_eq!(release_heavy.max_event_count(), 4);
    }

    #[test]
    fn test_unknown_macro() {
        let macros = [COPY];
        let player = MacroPlayer::new(&macros);
        let mut out = Vec::new();
        assert_eq!(player.play(3, true, &mut out), None);
        assert!(out.is_empty());
        assert!(!player.contains(1));
    }
}
