use embassy_time::Instant;

use crate::config::{TapHoldConfig, TapHoldMode};
use crate::event::{KeyPos, KeyboardEvent};

/// Disambiguation state of a dual-role key
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapHoldState {
    /// Pressed, role undetermined
    Pending,
    /// Resolved as tap, the tap keycode is down until release
    ResolvedTap,
    /// Resolved as hold, the layer or modifiers are active until release
    ResolvedHold,
}

/// What to do with an incoming event while a dual-role key is pending
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum TapHoldDecision {
    /// Resolve the pending key as hold, then process the event
    Hold,
    /// Resolve the pending key as tap. Only its own release decides this.
    Tap,
    /// Keep the event in the held buffer until the pending key is resolved
    Buffer,
    /// The event doesn't depend on the pending key, process it right away
    Ignore,
}

/// The dual-role key currently waiting for a decision.
///
/// Every press after it is buffered until it's resolved, so at most one key is pending.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct PendingKey {
    pub(crate) pos: KeyPos,
    pub(crate) pressed_at: Instant,
}

impl PendingKey {
    /// Whether the tap term has elapsed at `now`
    pub(crate) fn is_expired(&self, now: Instant, config: &TapHoldConfig) -> bool {
        now.saturating_duration_since(self.pressed_at) >= config.tap_term
    }

    /// Decide the fate of `event`.
    ///
    /// `press_buffered` tells whether the press of `event.pos` happened after the pending key
    /// was pressed, i.e. is in the held buffer.
    pub(crate) fn decide(&self, event: &KeyboardEvent, press_buffered: bool, config: &TapHoldConfig) -> TapHoldDecision {
        // The tap term ran out before this event, no matter what the event is
        if self.is_expired(event.time, config) {
            return TapHoldDecision::Hold;
        }

        if event.pos == self.pos {
            return if event.pressed {
                // Scanner desync, let the dispatcher drop it
                TapHoldDecision::Ignore
            } else {
                TapHoldDecision::Tap
            };
        }

        if event.pressed {
            return match config.mode {
                TapHoldMode::HoldOnOtherPress => TapHoldDecision::Hold,
                TapHoldMode::PermissiveHold | TapHoldMode::Normal => TapHoldDecision::Buffer,
            };
        }

        if !press_buffered {
            // The key was pressed before the pending key, its release is unrelated
            return TapHoldDecision::Ignore;
        }

        match config.mode {
            // Another key was pressed and released inside the pending key's hold
            TapHoldMode::PermissiveHold | TapHoldMode::HoldOnOtherPress => TapHoldDecision::Hold,
            TapHoldMode::Normal => TapHoldDecision::Buffer,
        }
    }
}
